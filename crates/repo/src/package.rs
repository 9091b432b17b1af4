//! Reading the bits of package metadata the CLI shows or acts on.

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use regex::Regex;
use serde::Deserialize;
use std::fmt::{self, Display};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

macro_rules! regex {
    ($name:ident, $pattern:expr) => {
        static $name: LazyLock<Regex> = LazyLock::new(|| Regex::new($pattern).unwrap());
    };
}

regex!(REMOTE_REFERENCE, r##"(?m)^\s*"\$kref"\s?:\s?"#/ckan/netkan/(.+)",?\r?$"##);

/// Summary of a `.netkan` or `.ckan` document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageInfo {
    pub identifier: String,
    pub path: PathBuf,
    pub depends: Vec<String>,
    pub recommends: Vec<String>,
}

#[derive(Deserialize)]
struct Document {
    identifier: String,
    #[serde(default)]
    depends: Vec<Relationship>,
    #[serde(default)]
    recommends: Vec<Relationship>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Relationship {
    Module { name: String },
    AnyOf { any_of: Vec<Relationship> },
}

impl Display for Relationship {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Module { name } => f.write_str(name),
            Self::AnyOf { any_of } => {
                for (i, relationship) in any_of.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" | ")?;
                    }
                    write!(f, "{relationship}")?;
                }
                Ok(())
            },
        }
    }
}

impl PackageInfo {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).or_raise(|| ErrorKind::Read(path.to_path_buf()))?;
        Self::parse(path, &content)
    }

    pub fn parse(path: impl Into<PathBuf>, content: &str) -> Result<Self> {
        let path = path.into();
        let document: Document = match serde_json::from_str(content) {
            Ok(document) => document,
            Err(err) => return Err(err).or_raise(|| ErrorKind::InvalidPackage(path)),
        };
        Ok(Self {
            identifier: document.identifier,
            path,
            depends: document.depends.iter().map(ToString::to_string).collect(),
            recommends: document.recommends.iter().map(ToString::to_string).collect(),
        })
    }
}

/// Location of the remote metadata a `.netkan` delegates to through a
/// `"$kref": "#/ckan/netkan/<url>"` line, if it has one.
pub fn remote_reference(content: &str) -> Option<&str> {
    REMOTE_REFERENCE.captures(content).and_then(|captures| captures.get(1)).map(|m| m.as_str())
}
