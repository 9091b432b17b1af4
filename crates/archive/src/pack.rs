//! Packing built packages into a servable tarball.

use crate::Compression;
use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use std::fs::File;
use std::path::Path;
use tar::Builder;
use tracing::instrument;

/// Pack `sources` into a tarball at `output`, each under its own file name at
/// the archive root. Directories are added recursively.
///
/// The compression layer is chosen from the output file name (so
/// `main.tar.gz` is gzipped). An existing `output` is overwritten. Returns the
/// number of top-level entries written.
#[instrument(skip(sources), fields(output = %output.as_ref().display()))]
pub fn pack<P: AsRef<Path>>(output: impl AsRef<Path>, sources: impl IntoIterator<Item = P>) -> Result<usize> {
    let output = output.as_ref();
    let compression = Compression::from_path(output);
    let file = File::create(output).or_raise(|| ErrorKind::Write(output.to_path_buf()))?;
    let mut builder = Builder::new(compression.encoder(file));
    builder.follow_symlinks(true);

    let mut count = 0;
    for source in sources {
        let source = source.as_ref();
        let Some(name) = source.file_name() else {
            exn::bail!(ErrorKind::InvalidPath(source.to_path_buf()));
        };
        if source.is_dir() {
            builder.append_dir_all(name, source).or_raise(|| ErrorKind::Read(source.to_path_buf()))?;
        } else {
            builder.append_path_with_name(source, name).or_raise(|| ErrorKind::Read(source.to_path_buf()))?;
        }
        tracing::debug!(source = %source.display(), "Added to archive");
        count += 1;
    }

    let encoder = builder.into_inner().or_raise(|| ErrorKind::Write(output.to_path_buf()))?;
    let file = encoder.finish().or_raise(|| ErrorKind::Write(output.to_path_buf()))?;
    file.sync_all().or_raise(|| ErrorKind::Write(output.to_path_buf()))?;
    tracing::info!(entries = count, %compression, "Archive packed");
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::unpack;
    use std::fs;

    #[test]
    fn test_pack_flattens_sources() {
        let temp = tempfile::tempdir().unwrap();
        let ckan = temp.path().join("local/ckan");
        fs::create_dir_all(ckan.join("Bundle")).unwrap();
        fs::write(ckan.join("Foo-1.0.ckan"), b"{\"identifier\": \"Foo\"}").unwrap();
        fs::write(ckan.join("Bar-2.1.ckan"), b"{\"identifier\": \"Bar\"}").unwrap();
        fs::write(ckan.join("Bundle/Baz-0.1.ckan"), b"{\"identifier\": \"Baz\"}").unwrap();

        let output = temp.path().join("main.tar.gz");
        let sources = [ckan.join("Foo-1.0.ckan"), ckan.join("Bar-2.1.ckan"), ckan.join("Bundle")];
        assert_eq!(pack(&output, &sources).unwrap(), 3);

        let bytes = fs::read(&output).unwrap();
        assert_eq!(Compression::from_magic_bytes(&bytes), Compression::Gzip);

        let extracted = temp.path().join("extracted");
        let stats = unpack(&extracted, bytes.as_slice()).unwrap();
        assert_eq!(stats.files, 3);
        assert_eq!(fs::read(extracted.join("Foo-1.0.ckan")).unwrap(), b"{\"identifier\": \"Foo\"}");
        assert_eq!(fs::read(extracted.join("Bundle/Baz-0.1.ckan")).unwrap(), b"{\"identifier\": \"Baz\"}");
    }

    #[test]
    fn test_pack_compression_follows_output_name() {
        let temp = tempfile::tempdir().unwrap();
        let source = temp.path().join("Foo-1.0.ckan");
        fs::write(&source, b"{\"identifier\": \"Foo\"}").unwrap();

        let output = temp.path().join("main.tar.bz2");
        assert_eq!(pack(&output, [&source]).unwrap(), 1);

        let bytes = fs::read(&output).unwrap();
        assert_eq!(Compression::from_magic_bytes(&bytes), Compression::Bzip2);
        let extracted = temp.path().join("extracted");
        unpack(&extracted, bytes.as_slice()).unwrap();
        assert_eq!(fs::read(extracted.join("Foo-1.0.ckan")).unwrap(), b"{\"identifier\": \"Foo\"}");
    }

    #[test]
    fn test_pack_nothing_is_an_empty_archive() {
        let temp = tempfile::tempdir().unwrap();
        let output = temp.path().join("main.tar.gz");
        let sources: [&Path; 0] = [];
        assert_eq!(pack(&output, sources).unwrap(), 0);
        let stats = unpack(temp.path().join("out"), File::open(&output).unwrap()).unwrap();
        assert_eq!(stats, Default::default());
    }

    #[test]
    fn test_pack_missing_source() {
        let temp = tempfile::tempdir().unwrap();
        let missing = temp.path().join("missing.ckan");
        let err = pack(temp.path().join("main.tar"), [&missing]).unwrap_err();
        assert_eq!(*err, ErrorKind::Read(missing));
    }
}
