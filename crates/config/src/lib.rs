//! Workspace settings.
//!
//! Settings are layered, later layers winning:
//!
//! 1. built-in defaults,
//! 2. the user's `config.toml` in the platform configuration directory,
//! 3. the workspace document (`kure.json`, `kure.toml` or `kure.yaml`),
//! 4. `KURE_`-prefixed environment variables (`__` separates nested keys).
//!
//! The repository list is validated once, here, so the rest of the program
//! only ever sees complete [`RepositoryDescriptor`]s.

pub mod error;

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use kure_repo::RepositoryDescriptor;
use serde::{Deserialize, Serialize};
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::instrument;

/// File name (without extension) of the workspace configuration document.
pub const FILE_STEM: &str = "kure";
/// Document formats looked for, in order of preference.
pub const FILE_EXTENSIONS: [&str; 4] = ["json", "toml", "yaml", "yml"];
pub const ENV_PREFIX: &str = "KURE_";

pub const DEFAULT_NETKAN_EXE: &str = "https://ckan-travis.s3.amazonaws.com/netkan.exe";
pub const DEFAULT_CACHEDIR: &str = "./cache/download/";
pub const DEFAULT_EXTENSION: &str = "netkan";
pub const DEFAULT_PORT: u16 = 8000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Where `update --netkan` downloads the compiler from.
    pub netkan_exe: String,
    /// Download cache handed to the compiler, relative to the workspace root
    /// unless absolute.
    pub cachedir: PathBuf,
    /// Package extension searched for by `get`.
    pub default_extension: String,
    pub port: u16,
    pub repos: Vec<RepositoryDescriptor>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            netkan_exe: DEFAULT_NETKAN_EXE.to_string(),
            cachedir: PathBuf::from(DEFAULT_CACHEDIR),
            default_extension: DEFAULT_EXTENSION.to_string(),
            port: DEFAULT_PORT,
            repos: Vec::new(),
        }
    }
}

/// Shape of the merged sources before validation: repository fields may be
/// missing here.
#[derive(Deserialize)]
struct RawConfig {
    netkan_exe: String,
    cachedir: PathBuf,
    default_extension: String,
    port: u16,
    #[serde(default)]
    repos: Vec<RawRepository>,
}

#[derive(Deserialize)]
struct RawRepository {
    name: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
    url: Option<String>,
}

impl Config {
    /// The document `kure init` writes: defaults plus the official NetKAN and
    /// CKAN-Meta repositories.
    pub fn template() -> Self {
        Self {
            repos: vec![
                RepositoryDescriptor::new(
                    "Offical Netkan",
                    "netkan",
                    "https://github.com/KSP-CKAN/NetKAN/archive/master.tar.gz",
                ),
                RepositoryDescriptor::new(
                    "Offical Ckan",
                    "ckan",
                    "https://github.com/KSP-CKAN/CKAN-Meta/archive/master.tar.gz",
                ),
            ],
            ..Self::default()
        }
    }

    /// Load the settings for the workspace rooted at `dir`.
    #[instrument]
    pub fn load(dir: &Path) -> Result<Self> {
        let user = user_config_path().filter(|path| path.is_file());
        Self::from_figment(&Self::figment(dir, user.as_deref()))
    }

    /// Every configuration layer for `dir`, merged but not yet extracted.
    pub fn figment(dir: &Path, user: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        if let Some(user) = user {
            tracing::debug!(path = %user.display(), "Using user configuration");
            figment = figment.merge(Toml::file(user));
        }
        if let Some(path) = workspace_file(dir) {
            tracing::debug!(path = %path.display(), "Using workspace configuration");
            figment = match path.extension().and_then(OsStr::to_str) {
                Some("json") => figment.merge(Json::file(&path)),
                Some("toml") => figment.merge(Toml::file(&path)),
                _ => figment.merge(Yaml::file(&path)),
            };
        }
        figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    pub fn from_figment(figment: &Figment) -> Result<Self> {
        let raw: RawConfig = figment.extract().or_raise(|| ErrorKind::Load)?;
        Ok(Self {
            repos: validate_repositories(raw.repos)?,
            netkan_exe: raw.netkan_exe,
            cachedir: raw.cachedir,
            default_extension: raw.default_extension,
            port: raw.port,
        })
    }

    /// Write these settings as a JSON document at `path` (owner read/write).
    pub fn write(&self, path: &Path) -> Result<()> {
        let failed = || ErrorKind::Write(path.to_path_buf());
        let mut document = serde_json::to_string_pretty(self).or_raise(failed)?;
        document.push('\n');
        fs::write(path, document).or_raise(failed)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(path, fs::Permissions::from_mode(0o600)).or_raise(failed)?;
        }
        Ok(())
    }
}

fn validate_repositories(raw: Vec<RawRepository>) -> Result<Vec<RepositoryDescriptor>> {
    let present = |value: Option<String>| value.filter(|v| !v.trim().is_empty());
    let mut repos = Vec::with_capacity(raw.len());
    let mut problems = Vec::new();
    for (index, entry) in raw.into_iter().enumerate() {
        match (present(entry.name), present(entry.kind), present(entry.url)) {
            (Some(name), Some(kind), Some(url)) => repos.push(RepositoryDescriptor { name, kind, url }),
            (name, kind, url) => {
                let missing: Vec<&str> = [("name", name.is_none()), ("type", kind.is_none()), ("url", url.is_none())]
                    .into_iter()
                    .filter_map(|(field, missing)| missing.then_some(field))
                    .collect();
                let label = match name {
                    Some(name) => format!("entry {} ({name})", index + 1),
                    None => format!("entry {}", index + 1),
                };
                problems.push(format!("{label} is missing {}", missing.join(", ")));
            },
        }
    }
    if !problems.is_empty() {
        exn::bail!(ErrorKind::InvalidRepositories(problems.join("; ")));
    }
    Ok(repos)
}

/// The configuration document of the workspace rooted at `dir`, if there is
/// one. Its presence is what makes `dir` a workspace.
pub fn workspace_file(dir: &Path) -> Option<PathBuf> {
    FILE_EXTENSIONS
        .iter()
        .map(|extension| dir.join(format!("{FILE_STEM}.{extension}")))
        .find(|path| path.is_file())
}

/// Location of the per-user `config.toml`.
pub fn user_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "kure").map(|dirs| dirs.config_dir().join("config.toml"))
}
