//! Repository Error Types
//!
//! Structured errors using `exn` for automatic location tracking and error
//! tree construction. Failures from `kure-archive`, `reqwest` and the
//! filesystem are kept as child frames of these kinds.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A repository error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for repository operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The HTTP client could not be constructed (TLS backend, etc).
    #[display("could not initialise HTTP client")]
    Client,
    /// Downloading a URL failed: transport error, error status, or the body
    /// could not be written to disk.
    #[display("could not download {_0}")]
    Fetch(#[error(not(source))] String),
    /// A downloaded file could not be created, written or given its mode.
    #[display("could not write {}", _0.display())]
    Write(#[error(not(source))] PathBuf),
    /// The repository cache could not be removed and recreated.
    #[display("could not clean repository cache {}", _0.display())]
    Clean(#[error(not(source))] PathBuf),
    /// A repository name (or type) can't be used as a directory name.
    #[display("invalid repository name: {_0}")]
    InvalidName(#[error(not(source))] String),
    /// A repository's archive could not be downloaded.
    #[display("could not download repository {_0}")]
    Download(#[error(not(source))] String),
    /// A repository's archive could not be unpacked.
    #[display("could not unpack repository {_0}")]
    Unpack(#[error(not(source))] String),
    /// The search root could not be walked.
    #[display("could not search {}", _0.display())]
    Walk(#[error(not(source))] PathBuf),
    /// The search query is not a valid glob pattern.
    #[display("invalid glob pattern: {_0}")]
    Pattern(#[error(not(source))] String),
    /// A package file could not be read.
    #[display("could not read package {}", _0.display())]
    Read(#[error(not(source))] PathBuf),
    /// A package file is not valid package metadata.
    #[display("invalid package metadata in {}", _0.display())]
    InvalidPackage(#[error(not(source))] PathBuf),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Fetch(_) | Self::Download(_) | Self::Clean(_))
    }
}
