//! Local mirror of the configured remote repositories.
//!
//! Each repository is downloaded as `<root>/<type>_<name>.tar.gz` and unpacked
//! into `<root>/<name>/`. Names are the identity of a repository: when two
//! descriptors share a name only the first one is mirrored.

use crate::error::{Error, ErrorKind, Result};
use crate::fetch::{FetchHandle, FileMode};
use exn::ResultExt;
use kure_archive::{UnpackStats, confine_name, unpack};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use tracing::instrument;

/// A remote repository archive to mirror.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryDescriptor {
    pub name: String,
    /// Repository flavour, usually `netkan` or `ckan`. Only used to name the
    /// downloaded archive.
    #[serde(rename = "type")]
    pub kind: String,
    pub url: String,
}

impl RepositoryDescriptor {
    pub fn new(name: impl Into<String>, kind: impl Into<String>, url: impl Into<String>) -> Self {
        Self { name: name.into(), kind: kind.into(), url: url.into() }
    }
}

/// A descriptor that was not mirrored because its name was already taken.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedRepository {
    pub name: String,
    pub url: String,
}

/// Outcome of [`RepositoryCache::sync`].
#[derive(Debug, Default)]
pub struct SyncReport {
    /// Names mirrored, in descriptor order.
    pub synced: Vec<String>,
    /// Duplicate-name descriptors that were ignored.
    pub skipped: Vec<SkippedRepository>,
    /// Set when a requested clean failed; the sync carried on regardless.
    pub clean_error: Option<Error>,
}

pub struct RepositoryCache {
    root: PathBuf,
    fetcher: FetchHandle,
    remove_dir: fn(&Path) -> io::Result<()>,
}

impl RepositoryCache {
    pub fn new(root: impl Into<PathBuf>, fetcher: FetchHandle) -> Self {
        Self { root: root.into(), fetcher, remove_dir: |path| fs::remove_dir_all(path) }
    }

    #[cfg(test)]
    fn with_remove_dir(mut self, remove_dir: fn(&Path) -> io::Result<()>) -> Self {
        self.remove_dir = remove_dir;
        self
    }

    /// Where the unpacked content of the repository called `name` lives.
    pub fn repository_dir(&self, name: &str) -> Result<PathBuf> {
        let name = confine_name(name).or_raise(|| ErrorKind::InvalidName(name.to_string()))?;
        Ok(self.root.join(name))
    }

    /// Mirror every repository in `descriptors`, in order.
    ///
    /// With `clean` the whole cache is emptied first; failing to do so is
    /// reported in [`SyncReport::clean_error`] rather than aborting. The first
    /// repository that cannot be downloaded or unpacked aborts the sync;
    /// repositories already mirrored stay in place.
    #[instrument(skip_all, fields(root = %self.root.display(), repositories = descriptors.len(), clean))]
    pub fn sync(&self, descriptors: &[RepositoryDescriptor], clean: bool) -> Result<SyncReport> {
        let mut report = SyncReport::default();
        if clean && let Err(err) = self.clean() {
            tracing::warn!(error = ?err, "Could not clean repository cache, continuing without");
            report.clean_error = Some(err);
        }

        let mut seen: HashSet<&str> = HashSet::new();
        for descriptor in descriptors {
            if !seen.insert(descriptor.name.as_str()) {
                tracing::warn!(name = %descriptor.name, url = %descriptor.url, "Repository name is not unique, ignoring");
                report.skipped.push(SkippedRepository { name: descriptor.name.clone(), url: descriptor.url.clone() });
                continue;
            }
            self.sync_one(descriptor)?;
            report.synced.push(descriptor.name.clone());
        }
        Ok(report)
    }

    #[instrument(skip_all, fields(name = %descriptor.name, kind = %descriptor.kind))]
    fn sync_one(&self, descriptor: &RepositoryDescriptor) -> Result<UnpackStats> {
        let target = self.repository_dir(&descriptor.name)?;
        let archive_name = format!("{}_{}.tar.gz", descriptor.kind, descriptor.name);
        let archive = self.root.join(confine_name(&archive_name).or_raise(|| ErrorKind::InvalidName(archive_name))?);

        tracing::info!(url = %descriptor.url, "Downloading repository");
        self.fetcher
            .fetch(&descriptor.url, &archive, FileMode::Data)
            .or_raise(|| ErrorKind::Download(descriptor.name.clone()))?;

        let unpack_failed = || ErrorKind::Unpack(descriptor.name.clone());
        let file = File::open(&archive).or_raise(unpack_failed)?;
        let stats = unpack(&target, file).or_raise(unpack_failed)?;
        tracing::info!(files = stats.files, directories = stats.directories, "Repository unpacked");
        Ok(stats)
    }

    /// Remove everything in the cache and recreate its (empty) root.
    #[instrument(skip(self), fields(root = %self.root.display()))]
    pub fn clean(&self) -> Result<()> {
        let failed = || ErrorKind::Clean(self.root.clone());
        match (self.remove_dir)(&self.root) {
            Ok(()) => tracing::debug!("Repository cache removed"),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {},
            Err(err) => return Err(err).or_raise(failed),
        }
        create_private_dir(&self.root).or_raise(failed)
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::MockFetcher;
    use kure_archive::Compression;
    use std::collections::BTreeMap;
    use std::sync::Arc;
    use walkdir::WalkDir;

    const NETKAN: &str = "https://github.com/KSP-CKAN/NetKAN/archive/master.tar.gz";
    const CKAN: &str = "https://github.com/KSP-CKAN/CKAN-Meta/archive/master.tar.gz";
    const MIRROR: &str = "https://example.com/netkan-mirror.tar.gz";

    fn tarball(files: &[(&str, &str)]) -> Vec<u8> {
        let mut builder = tar::Builder::new(Compression::Gzip.encoder(Vec::new()));
        for (path, content) in files {
            let mut header = tar::Header::new_gnu();
            header.set_size(content.len() as u64);
            header.set_mode(0o644);
            header.set_mtime(1_500_000_000);
            builder.append_data(&mut header, path, content.as_bytes()).unwrap();
        }
        builder.into_inner().unwrap().finish().unwrap()
    }

    fn fetcher() -> Arc<MockFetcher> {
        Arc::new(
            MockFetcher::new()
                .with_response(NETKAN, tarball(&[("NetKAN-master/NetKAN/Foo.netkan", "{\"identifier\": \"Foo\"}")]))
                .with_response(CKAN, tarball(&[("CKAN-Meta-master/Foo/Foo-1.0.ckan", "{\"identifier\": \"Foo\"}")]))
                .with_response(MIRROR, tarball(&[("mirror/Bar.netkan", "{\"identifier\": \"Bar\"}")])),
        )
    }

    /// Relative path to file contents for everything under `root`.
    fn snapshot(root: &Path) -> BTreeMap<PathBuf, Option<Vec<u8>>> {
        WalkDir::new(root)
            .min_depth(1)
            .into_iter()
            .map(|entry| {
                let entry = entry.unwrap();
                let content = entry.file_type().is_file().then(|| fs::read(entry.path()).unwrap());
                (entry.path().strip_prefix(root).unwrap().to_path_buf(), content)
            })
            .collect()
    }

    #[test]
    fn test_sync_mirrors_every_repository() {
        let temp = tempfile::tempdir().unwrap();
        let root = temp.path().join("cache/repo");
        let fetcher = fetcher();
        let cache = RepositoryCache::new(&root, fetcher.clone());

        let report = cache
            .sync(&[RepositoryDescriptor::new("netkan", "netkan", NETKAN), RepositoryDescriptor::new("ckan", "ckan", CKAN)], false)
            .unwrap();

        assert_eq!(report.synced, ["netkan", "ckan"]);
        assert!(report.skipped.is_empty());
        assert!(root.join("netkan_netkan.tar.gz").is_file());
        assert!(root.join("ckan_ckan.tar.gz").is_file());
        assert!(root.join("netkan/NetKAN-master/NetKAN/Foo.netkan").is_file());
        assert!(root.join("ckan/CKAN-Meta-master/Foo/Foo-1.0.ckan").is_file());
        assert_eq!(fetcher.requests(), [NETKAN, CKAN]);
    }

    #[test]
    fn test_duplicate_names_keep_first() {
        let temp = tempfile::tempdir().unwrap();
        let fetcher = fetcher();
        let cache = RepositoryCache::new(temp.path(), fetcher.clone());

        let report = cache
            .sync(&[RepositoryDescriptor::new("A", "netkan", NETKAN), RepositoryDescriptor::new("A", "netkan", MIRROR)], true)
            .unwrap();

        assert_eq!(fetcher.requests(), [NETKAN]);
        assert_eq!(report.synced, ["A"]);
        assert_eq!(report.skipped, [SkippedRepository { name: "A".to_string(), url: MIRROR.to_string() }]);
        assert!(temp.path().join("A/NetKAN-master/NetKAN/Foo.netkan").is_file());
        assert!(!temp.path().join("A/mirror").exists());
    }

    #[test]
    fn test_clean_sync_is_idempotent() {
        let temp = tempfile::tempdir().unwrap();
        let root = temp.path().join("repo");
        let cache = RepositoryCache::new(&root, fetcher());
        let descriptors = [RepositoryDescriptor::new("netkan", "netkan", NETKAN)];

        cache.sync(&descriptors, true).unwrap();
        let first = snapshot(&root);
        fs::create_dir_all(root.join("stale")).unwrap();
        fs::write(root.join("stale/Old.netkan"), b"{}").unwrap();
        cache.sync(&descriptors, true).unwrap();

        assert_eq!(snapshot(&root), first);
    }

    #[test]
    fn test_sync_without_clean_keeps_existing_content() {
        let temp = tempfile::tempdir().unwrap();
        fs::create_dir_all(temp.path().join("other")).unwrap();
        fs::write(temp.path().join("other/Keep.netkan"), b"{}").unwrap();

        let cache = RepositoryCache::new(temp.path(), fetcher());
        cache.sync(&[RepositoryDescriptor::new("netkan", "netkan", NETKAN)], false).unwrap();

        assert!(temp.path().join("other/Keep.netkan").is_file());
        assert!(temp.path().join("netkan/NetKAN-master/NetKAN/Foo.netkan").is_file());
    }

    #[test]
    fn test_failed_download_aborts_remaining() {
        let temp = tempfile::tempdir().unwrap();
        let fetcher = fetcher();
        let cache = RepositoryCache::new(temp.path(), fetcher.clone());
        let descriptors = [
            RepositoryDescriptor::new("netkan", "netkan", NETKAN),
            RepositoryDescriptor::new("broken", "ckan", "http://127.0.0.1:1/missing.tar.gz"),
            RepositoryDescriptor::new("ckan", "ckan", CKAN),
        ];

        let err = cache.sync(&descriptors, false).unwrap_err();
        assert_eq!(*err, ErrorKind::Download("broken".to_string()));
        assert_eq!(fetcher.requests().len(), 2);
        assert!(temp.path().join("netkan").is_dir());
        assert!(!temp.path().join("ckan").exists());
    }

    #[test]
    fn test_corrupt_archive_is_unpack_error() {
        let temp = tempfile::tempdir().unwrap();
        let fetcher = Arc::new(MockFetcher::new().with_response(NETKAN, b"<html>rate limited</html>".to_vec()));
        let cache = RepositoryCache::new(temp.path(), fetcher);

        let err = cache.sync(&[RepositoryDescriptor::new("netkan", "netkan", NETKAN)], false).unwrap_err();
        assert_eq!(*err, ErrorKind::Unpack("netkan".to_string()));
    }

    #[test]
    fn test_invalid_name_is_rejected_before_download() {
        let temp = tempfile::tempdir().unwrap();
        let fetcher = fetcher();
        let cache = RepositoryCache::new(temp.path().join("repo"), fetcher.clone());

        let err = cache.sync(&[RepositoryDescriptor::new("../escape", "netkan", NETKAN)], false).unwrap_err();
        assert_eq!(*err, ErrorKind::InvalidName("../escape".to_string()));
        assert!(fetcher.requests().is_empty());
        assert!(!temp.path().join("escape").exists());
    }

    #[test]
    fn test_failed_clean_is_reported_and_sync_continues() {
        let temp = tempfile::tempdir().unwrap();
        fs::create_dir_all(temp.path().join("stale")).unwrap();
        fs::write(temp.path().join("stale/Old.netkan"), b"{}").unwrap();
        let cache = RepositoryCache::new(temp.path(), fetcher())
            .with_remove_dir(|_| Err(io::Error::new(io::ErrorKind::ResourceBusy, "cache is in use")));

        let report = cache
            .sync(&[RepositoryDescriptor::new("netkan", "netkan", NETKAN), RepositoryDescriptor::new("ckan", "ckan", CKAN)], true)
            .unwrap();

        let clean_error = report.clean_error.expect("clean should have failed");
        assert_eq!(*clean_error, ErrorKind::Clean(temp.path().to_path_buf()));
        assert_eq!(report.synced, ["netkan", "ckan"]);
        assert!(temp.path().join("netkan/NetKAN-master/NetKAN/Foo.netkan").is_file());
        assert!(temp.path().join("ckan/CKAN-Meta-master/Foo/Foo-1.0.ckan").is_file());
        assert!(temp.path().join("stale/Old.netkan").is_file());
    }

    #[test]
    fn test_clean_missing_root() {
        let temp = tempfile::tempdir().unwrap();
        let root = temp.path().join("not/yet/there");
        RepositoryCache::new(&root, fetcher()).clean().unwrap();
        assert!(root.is_dir());
        assert_eq!(fs::read_dir(&root).unwrap().count(), 0);
    }

    #[test]
    fn test_descriptor_uses_type_key() {
        let descriptor: RepositoryDescriptor =
            serde_json::from_str(r#"{"name": "Offical Netkan", "type": "netkan", "url": "https://example.com/a.tar.gz"}"#)
                .unwrap();
        assert_eq!(descriptor, RepositoryDescriptor::new("Offical Netkan", "netkan", "https://example.com/a.tar.gz"));
    }
}
