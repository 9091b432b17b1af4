//! Streaming tarball extraction.

use crate::Compression;
use crate::error::{ErrorKind, Result};
use crate::path::confine;
use exn::ResultExt;
use filetime::FileTime;
use std::fs::{self, File};
use std::io::{self, BufReader, Read};
use std::path::{Component, Path, PathBuf};
use tar::{Archive, Entry, EntryType, Header};
use tracing::instrument;

/// What an [`unpack`] run materialised.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct UnpackStats {
    pub directories: u64,
    pub files: u64,
    /// Entries of a type that isn't extracted (links, devices, fifos, ...).
    pub skipped: u64,
}

/// Extract a (compressed) tarball into `target`.
///
/// Directories and regular files are recreated with their stored mode and
/// timestamps; global extended headers are ignored; every other entry type is
/// skipped with a warning. Entry names are [confined](crate::confine) to
/// `target`, and a name that would escape it aborts the whole extraction.
///
/// Any read error from the decompressor or the tar reader, and any failure to
/// create or write an entry, aborts immediately. Whatever was written before
/// the failure stays on disk.
///
/// Directory attributes are applied once every entry has been written, so a
/// read-only directory mode doesn't block its own contents and directory
/// timestamps aren't bumped by the files created inside them.
#[instrument(skip(reader), fields(target = %target.as_ref().display()))]
pub fn unpack<R: Read>(target: impl AsRef<Path>, reader: R) -> Result<UnpackStats> {
    let target = target.as_ref();
    let mut reader = BufReader::new(reader);
    let compression = Compression::detect(&mut reader).or_raise(|| ErrorKind::InvalidData)?;
    tracing::debug!(%compression, "Detected archive compression");

    let mut archive = Archive::new(compression.wrap_reader(reader));
    let mut stats = UnpackStats::default();
    let mut directories: Vec<(PathBuf, Header)> = Vec::new();
    for entry in archive.entries().or_raise(|| ErrorKind::InvalidData)? {
        let mut entry = entry.or_raise(|| ErrorKind::InvalidData)?;
        let header = entry.header().clone();
        match header.entry_type() {
            EntryType::Directory if names_target(&entry) => {
                // `tar -C dir -c .` writes the archive root itself as `./`.
                fs::create_dir_all(target).or_raise(|| ErrorKind::Write(target.to_path_buf()))?;
                tracing::debug!("Archive root entry maps onto the target");
            },
            EntryType::Directory => {
                let dest = destination(target, &entry)?;
                fs::create_dir_all(&dest).or_raise(|| ErrorKind::Write(dest.clone()))?;
                directories.push((dest, header));
                stats.directories += 1;
            },
            EntryType::Regular => {
                let dest = destination(target, &entry)?;
                write_file(&mut entry, &dest)?;
                apply_attributes(&dest, &header);
                stats.files += 1;
            },
            EntryType::XGlobalHeader => {
                tracing::debug!("Ignoring global extended header");
            },
            other => {
                let name = entry.path().map(|p| p.display().to_string()).unwrap_or_default();
                tracing::warn!(entry = %name, entry_type = ?other, "Skipping unsupported archive entry");
                stats.skipped += 1;
            },
        }
    }
    // Deepest first, so a parent's timestamps are set after its children.
    for (dest, header) in directories.iter().rev() {
        apply_attributes(dest, header);
    }
    tracing::info!(
        directories = stats.directories,
        files = stats.files,
        skipped = stats.skipped,
        "Archive unpacked"
    );
    Ok(stats)
}

fn destination<R: Read>(target: &Path, entry: &Entry<'_, R>) -> Result<PathBuf> {
    let name = entry.path().or_raise(|| ErrorKind::InvalidData)?;
    Ok(target.join(confine(&name)?))
}

/// Whether the entry name is the archive root (`./`, `/`) rather than
/// anything below it.
fn names_target<R: Read>(entry: &Entry<'_, R>) -> bool {
    entry
        .path()
        .is_ok_and(|name| name.components().all(|c| matches!(c, Component::CurDir | Component::RootDir)))
}

fn write_file(entry: &mut impl Read, dest: &Path) -> Result<()> {
    // Archives are allowed to omit directory entries.
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).or_raise(|| ErrorKind::Write(parent.to_path_buf()))?;
    }
    let mut file = File::create(dest).or_raise(|| ErrorKind::Write(dest.to_path_buf()))?;
    if let Err(err) = io::copy(entry, &mut file) {
        // The copy fails either reading the archive or writing the file.
        let kind = match err.kind() {
            io::ErrorKind::InvalidData | io::ErrorKind::InvalidInput | io::ErrorKind::UnexpectedEof => {
                ErrorKind::InvalidData
            },
            _ => ErrorKind::Write(dest.to_path_buf()),
        };
        return Err(err).or_raise(|| kind);
    }
    Ok(())
}

/// Best effort: a file whose mode or timestamps couldn't be restored is still
/// a usable file.
fn apply_attributes(path: &Path, header: &Header) {
    #[cfg(unix)]
    if let Ok(mode) = header.mode() {
        use std::os::unix::fs::PermissionsExt;
        if let Err(err) = fs::set_permissions(path, fs::Permissions::from_mode(mode & 0o7777)) {
            tracing::warn!(path = %path.display(), error = %err, "Could not set permissions");
        }
    }
    let Ok(mtime) = header.mtime() else {
        return;
    };
    let modified = unix_time(mtime);
    let accessed = header.as_gnu().and_then(|gnu| gnu.atime().ok()).map(unix_time).unwrap_or(modified);
    if let Err(err) = filetime::set_file_times(path, accessed, modified) {
        tracing::warn!(path = %path.display(), error = %err, "Could not set timestamps");
    }
}

fn unix_time(seconds: u64) -> FileTime {
    FileTime::from_unix_time(i64::try_from(seconds).unwrap_or(i64::MAX), 0)
}
