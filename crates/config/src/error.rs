use derive_more::{Display, Error};
use std::path::PathBuf;

pub type Error = exn::Exn<ErrorKind>;
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// A configuration source exists but can't be parsed into settings.
    #[display("could not load configuration")]
    Load,
    /// Entries in the repository list lack required fields. Every offending
    /// entry is listed.
    #[display("invalid repository list: {_0}")]
    InvalidRepositories(#[error(not(source))] String),
    #[display("could not write configuration to {}", _0.display())]
    Write(#[error(not(source))] PathBuf),
}

impl ErrorKind {
    pub fn is_retryable(&self) -> bool {
        false
    }
}
