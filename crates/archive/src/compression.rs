//! Compression detection and stream wrapping.
//!
//! Repository archives are normally gzip tarballs (that's what GitHub hands
//! out), but a mirror can just as well serve bzip2 or a bare tarball. The
//! format is sniffed from the first bytes of the stream rather than trusted
//! from the URL.

use bzip2::{Compression as BzCompression, read::BzDecoder, write::BzEncoder};
use flate2::{Compression as GzCompression, read::GzDecoder, write::GzEncoder};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::io::{self, BufRead, Read, Write};
use std::path::Path;

const BZIP2_MAGIC: [u8; 3] = [0x42, 0x5A, 0x68];
const GZIP_MAGIC: [u8; 2] = [0x1F, 0x8B];

// Served archives are small text files; there is no reason not to squeeze.
const BZIP2_LEVEL: BzCompression = BzCompression::best();
const GZIP_LEVEL: GzCompression = GzCompression::best();

/// Compression layer around a tarball.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Compression {
    /// Uncompressed tarball
    #[default]
    None,
    /// Bzip2 compression (.tar.bz2, .tbz2)
    Bzip2,
    /// Gzip compression (.tar.gz, .tgz)
    Gzip,
}

impl Display for Compression {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

impl Compression {
    /// Short name for displaying to the user.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Compression::None => "none",
            Compression::Bzip2 => "bzip2",
            Compression::Gzip => "gzip",
        }
    }

    /// Guess the compression of an archive from its file name.
    #[must_use]
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        path.as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| match ext.to_lowercase().as_str() {
                "gz" | "tgz" => Compression::Gzip,
                "bz2" | "tbz2" => Compression::Bzip2,
                _ => Compression::None,
            })
            .unwrap_or_default()
    }

    /// Detect compression from magic bytes. Anything unrecognised (including
    /// input too short to tell) is treated as an uncompressed tarball.
    #[must_use]
    pub fn from_magic_bytes(bytes: &[u8]) -> Self {
        if bytes.starts_with(&GZIP_MAGIC) {
            return Compression::Gzip;
        }
        if bytes.starts_with(&BZIP2_MAGIC) {
            return Compression::Bzip2;
        }
        Compression::None
    }

    /// Peek at the head of a buffered stream without consuming it.
    pub fn detect<R: BufRead>(reader: &mut R) -> io::Result<Self> {
        Ok(Self::from_magic_bytes(reader.fill_buf()?))
    }

    /// Wrap a reader with the matching decompression layer.
    pub fn wrap_reader<'a, R: Read + 'a>(&self, reader: R) -> Box<dyn Read + 'a> {
        match self {
            Compression::None => Box::new(reader),
            Compression::Bzip2 => Box::new(BzDecoder::new(reader)),
            Compression::Gzip => Box::new(GzDecoder::new(reader)),
        }
    }

    /// Wrap a writer with the matching compression layer.
    ///
    /// Unlike a boxed writer, the returned [`Encoder`] must be
    /// [finished](Encoder::finish) so that trailer errors are not lost on drop.
    pub fn encoder<W: Write>(&self, writer: W) -> Encoder<W> {
        match self {
            Compression::None => Encoder::None(writer),
            Compression::Bzip2 => Encoder::Bzip2(BzEncoder::new(writer, BZIP2_LEVEL)),
            Compression::Gzip => Encoder::Gzip(GzEncoder::new(writer, GZIP_LEVEL)),
        }
    }
}

/// A writer that compresses into `W`.
pub enum Encoder<W: Write> {
    None(W),
    Bzip2(BzEncoder<W>),
    Gzip(GzEncoder<W>),
}

impl<W: Write> Encoder<W> {
    /// Write the compression trailer and hand back the inner writer.
    pub fn finish(self) -> io::Result<W> {
        match self {
            Encoder::None(mut w) => {
                w.flush()?;
                Ok(w)
            },
            Encoder::Bzip2(e) => e.finish(),
            Encoder::Gzip(e) => e.finish(),
        }
    }
}

impl<W: Write> Write for Encoder<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Encoder::None(w) => w.write(buf),
            Encoder::Bzip2(e) => e.write(buf),
            Encoder::Gzip(e) => e.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Encoder::None(w) => w.flush(),
            Encoder::Bzip2(e) => e.flush(),
            Encoder::Gzip(e) => e.flush(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::io::{BufReader, Cursor};

    #[rstest]
    #[case("main.tar.gz", Compression::Gzip)]
    #[case("main.tgz", Compression::Gzip)]
    #[case("netkan_Official.TAR.GZ", Compression::Gzip)]
    #[case("main.tar.bz2", Compression::Bzip2)]
    #[case("main.tar", Compression::None)]
    #[case("Foo.netkan", Compression::None)]
    // A dotfile has no extension at all.
    #[case(".gz", Compression::None)]
    fn test_from_path(#[case] path: &str, #[case] expected: Compression) {
        assert_eq!(Compression::from_path(path), expected);
    }

    #[rstest]
    #[case(&[0x1F, 0x8B, 0x08, 0x00], Compression::Gzip)]
    #[case(&[0x42, 0x5A, 0x68, 0x39], Compression::Bzip2)]
    #[case(b"NetKAN-master/\0\0\0", Compression::None)]
    #[case(&[0x1F], Compression::None)]
    #[case(&[], Compression::None)]
    fn test_from_magic_bytes(#[case] bytes: &[u8], #[case] expected: Compression) {
        assert_eq!(Compression::from_magic_bytes(bytes), expected);
    }

    #[test]
    fn test_detect_does_not_consume() {
        let mut encoder = Compression::Gzip.encoder(Vec::new());
        encoder.write_all(b"identifier").unwrap();
        let compressed = encoder.finish().unwrap();

        let mut reader = BufReader::new(Cursor::new(compressed.clone()));
        assert_eq!(Compression::detect(&mut reader).unwrap(), Compression::Gzip);
        let mut rest = Vec::new();
        reader.read_to_end(&mut rest).unwrap();
        assert_eq!(rest, compressed);
    }

    #[rstest]
    #[case(Compression::None)]
    #[case(Compression::Bzip2)]
    #[case(Compression::Gzip)]
    fn test_encoder_output_is_detected(#[case] format: Compression) {
        let mut encoder = format.encoder(Vec::new());
        encoder.write_all(b"{\"identifier\": \"Foo\"}").unwrap();
        let output = encoder.finish().unwrap();
        if format != Compression::None {
            assert_eq!(Compression::from_magic_bytes(&output), format);
        }
        let mut decoded = Vec::new();
        format.wrap_reader(output.as_slice()).read_to_end(&mut decoded).unwrap();
        assert_eq!(decoded, b"{\"identifier\": \"Foo\"}");
    }
}
