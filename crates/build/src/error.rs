//! Build Error Types

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A build error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for build operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The compiler binary hasn't been downloaded.
    #[display("compiler not found at {}, run `kure update --netkan` first", _0.display())]
    MissingCompiler(#[error(not(source))] PathBuf),
    /// A `.exe` compiler needs an interpreter that isn't on the search path.
    #[display("{_0} is required to run the compiler but was not found in PATH")]
    MissingInterpreter(#[error(not(source))] String),
    /// The compiler process could not be started.
    #[display("could not run {}", _0.display())]
    Launch(#[error(not(source))] PathBuf),
    #[display("could not compile {}", _0.display())]
    Compile(#[error(not(source))] PathBuf),
    /// The compiler ran but reported failure.
    #[display("compiling {} failed ({status})", path.display())]
    Failed { path: PathBuf, status: String },
    /// The sources directory could not be listed.
    #[display("could not list sources in {}", _0.display())]
    Sources(#[error(not(source))] PathBuf),
}

impl ErrorKind {
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Launch(_))
    }
}
