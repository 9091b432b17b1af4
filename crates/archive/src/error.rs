//! Archive Error Types
//!
//! Structured errors using `exn` for automatic location tracking and error
//! tree construction. The I/O error that caused a failure is attached as a
//! child frame; the kind says which path it happened to.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// An archive error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for archive operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The archive stream is corrupt, truncated or not a tarball. Don't retry
    /// with the same input.
    #[display("invalid or corrupted archive")]
    InvalidData,
    /// An entry name escapes the extraction root or is otherwise unusable.
    #[display("invalid archive path: {}", _0.display())]
    InvalidPath(#[error(not(source))] PathBuf),
    /// A file or directory could not be read while packing.
    #[display("could not read {}", _0.display())]
    Read(#[error(not(source))] PathBuf),
    /// A file or directory could not be created or written.
    #[display("could not write {}", _0.display())]
    Write(#[error(not(source))] PathBuf),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Read(_) | Self::Write(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use exn::ResultExt;

    #[test]
    fn error_kind_display() {
        assert_eq!(ErrorKind::InvalidData.to_string(), "invalid or corrupted archive");
        assert_eq!(
            ErrorKind::InvalidPath(PathBuf::from("../etc/passwd")).to_string(),
            "invalid archive path: ../etc/passwd"
        );
        assert_eq!(ErrorKind::Write(PathBuf::from("repo/a.netkan")).to_string(), "could not write repo/a.netkan");
    }

    #[test]
    fn error_kind_retryable() {
        assert!(!ErrorKind::InvalidData.is_retryable());
        assert!(!ErrorKind::InvalidPath(PathBuf::from("..")).is_retryable());
        assert!(ErrorKind::Write(PathBuf::from("a")).is_retryable());
    }

    #[test]
    fn error_from_io_result() {
        let result: std::result::Result<(), std::io::Error> =
            Err(std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only filesystem"));
        let err = result.or_raise(|| ErrorKind::Write(PathBuf::from("out"))).unwrap_err();
        assert_eq!(*err, ErrorKind::Write(PathBuf::from("out")));
    }
}
