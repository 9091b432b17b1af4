//! The on-disk shape of a kure workspace.
//!
//! ```text
//! <root>/
//!   kure.json          settings (see kure-config)
//!   local/netkan/      package sources to build
//!   local/ckan/        built packages, served by `kure serve`
//!   cache/repo/<name>/ mirrored remote repositories
//!   cache/bin/         downloaded compiler
//!   cache/download/    compiler download cache (configurable)
//!   cache/server/      what `kure serve` publishes
//! ```

pub mod error;

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use kure_config::Config;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::instrument;

pub use kure_config::workspace_file;

/// Paths of a workspace rooted at some directory. Nothing is checked on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    root: PathBuf,
}

impl Layout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config_file(&self) -> PathBuf {
        self.root.join(format!("{}.json", kure_config::FILE_STEM))
    }

    pub fn local_netkan(&self) -> PathBuf {
        self.root.join("local").join("netkan")
    }

    pub fn local_ckan(&self) -> PathBuf {
        self.root.join("local").join("ckan")
    }

    pub fn repo_cache(&self) -> PathBuf {
        self.root.join("cache").join("repo")
    }

    pub fn server_dir(&self) -> PathBuf {
        self.root.join("cache").join("server")
    }

    pub fn bin_dir(&self) -> PathBuf {
        self.root.join("cache").join("bin")
    }

    pub fn netkan_exe(&self) -> PathBuf {
        self.bin_dir().join("netkan.exe")
    }

    /// The default download cache, used when the configuration doesn't name one.
    pub fn download_cache(&self) -> PathBuf {
        self.root.join("cache").join("download")
    }

    /// Every directory `init` creates.
    pub fn directories(&self) -> [PathBuf; 6] {
        [
            self.local_netkan(),
            self.local_ckan(),
            self.repo_cache(),
            self.server_dir(),
            self.download_cache(),
            self.bin_dir(),
        ]
    }
}

/// An opened workspace: its layout plus its loaded settings.
#[derive(Debug, Clone)]
pub struct Workspace {
    layout: Layout,
    config: Config,
}

impl Workspace {
    /// Open the workspace rooted at `dir`, which must contain a configuration
    /// document.
    #[instrument(fields(dir = %dir.as_ref().display()), skip(dir))]
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let root = std::path::absolute(dir).or_raise(|| ErrorKind::NotAWorkspace(dir.to_path_buf()))?;
        if workspace_file(&root).is_none() {
            exn::bail!(ErrorKind::NotAWorkspace(root));
        }
        let config = Config::load(&root).or_raise(|| ErrorKind::Config)?;
        tracing::debug!(root = %root.display(), repositories = config.repos.len(), "Workspace opened");
        Ok(Self { layout: Layout::new(root), config })
    }

    /// Create a new workspace at `dir`, which must not exist yet, with every
    /// directory of the layout and a default `kure.json`.
    #[instrument(fields(dir = %dir.as_ref().display()), skip(dir))]
    pub fn init(dir: impl AsRef<Path>) -> Result<Layout> {
        let dir = dir.as_ref();
        if dir.exists() {
            exn::bail!(ErrorKind::AlreadyExists(dir.to_path_buf()));
        }
        let layout = Layout::new(dir);
        for directory in layout.directories() {
            create_private_dir(&directory).or_raise(|| ErrorKind::Create(directory.clone()))?;
            tracing::debug!(path = %directory.display(), "Created directory");
        }
        let config_file = layout.config_file();
        Config::template()
            .write(&config_file)
            .or_raise(|| ErrorKind::Create(config_file.clone()))?;
        tracing::info!(root = %dir.display(), "Workspace initialised");
        Ok(layout)
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn root(&self) -> &Path {
        self.layout.root()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The compiler download cache from the settings, resolved against the
    /// workspace root.
    pub fn download_cache(&self) -> PathBuf {
        self.root().join(&self.config.cachedir)
    }
}

#[cfg(unix)]
fn create_private_dir(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::DirBuilderExt;
    fs::DirBuilder::new().recursive(true).mode(0o700).create(path)
}

#[cfg(not(unix))]
fn create_private_dir(path: &Path) -> io::Result<()> {
    fs::create_dir_all(path)
}
