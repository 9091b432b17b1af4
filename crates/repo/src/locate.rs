//! Finding package files by name under a directory tree.

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use glob::{MatchOptions, Pattern};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::instrument;
use walkdir::WalkDir;

/// How a query is matched against file names.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SearchMode {
    /// Case-insensitive substring of the full file name (extension included).
    #[default]
    Simple,
    /// Case-sensitive shell pattern (`*`, `?`, `[...]`) matched against the
    /// whole file name with its extension removed.
    Glob,
}

const GLOB_OPTIONS: MatchOptions =
    MatchOptions { case_sensitive: true, require_literal_separator: true, require_literal_leading_dot: false };

enum Matcher {
    Simple(String),
    Glob(Pattern),
}

impl Matcher {
    fn new(query: &str, mode: SearchMode) -> Result<Self> {
        Ok(match mode {
            SearchMode::Simple => Self::Simple(query.to_lowercase()),
            SearchMode::Glob => {
                Self::Glob(Pattern::new(query).or_raise(|| ErrorKind::Pattern(query.to_string()))?)
            },
        })
    }

    fn matches(&self, file_name: &str, extension: &str) -> bool {
        match self {
            Self::Simple(needle) => file_name.to_lowercase().contains(needle.as_str()),
            Self::Glob(pattern) => {
                let stem = file_name
                    .strip_suffix(extension)
                    .and_then(|rest| rest.strip_suffix('.'))
                    .unwrap_or(file_name);
                pattern.matches_with(stem, GLOB_OPTIONS)
            },
        }
    }
}

/// Find every regular file below `root` whose extension is one of
/// `extensions` and whose name matches `query`.
///
/// Results come back in walk order, with entries sorted by file name at each
/// level. Unreadable subdirectories are skipped; an unreadable `root` is an
/// error. An empty result is not.
#[instrument(skip(extensions), fields(root = %root.as_ref().display()))]
pub fn find<S: AsRef<str>>(
    root: impl AsRef<Path>,
    extensions: &[S],
    query: &str,
    mode: SearchMode,
) -> Result<Vec<PathBuf>> {
    let root = root.as_ref();
    let matcher = Matcher::new(query, mode)?;

    let mut found = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) if err.depth() == 0 => return Err(err).or_raise(|| ErrorKind::Walk(root.to_path_buf())),
            Err(err) => {
                tracing::debug!(error = %err, "Skipping unreadable entry");
                continue;
            },
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let Some(extension) = path.extension().and_then(OsStr::to_str) else {
            continue;
        };
        if !extensions.iter().any(|allowed| allowed.as_ref() == extension) {
            continue;
        }
        let Some(file_name) = path.file_name().and_then(OsStr::to_str) else {
            continue;
        };
        if matcher.matches(file_name, extension) {
            tracing::trace!(path = %path.display(), "Match");
            found.push(entry.into_path());
        }
    }
    tracing::debug!(matches = found.len(), "Search finished");
    Ok(found)
}
