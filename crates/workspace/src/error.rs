use derive_more::{Display, Error};
use std::path::PathBuf;

pub type Error = exn::Exn<ErrorKind>;
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// No configuration document in the directory; most commands only make
    /// sense inside a workspace.
    #[display("{} is not a kure workspace (no kure.json found), run `kure init` first", _0.display())]
    NotAWorkspace(#[error(not(source))] PathBuf),
    #[display("{} already exists", _0.display())]
    AlreadyExists(#[error(not(source))] PathBuf),
    #[display("could not create {}", _0.display())]
    Create(#[error(not(source))] PathBuf),
    #[display("invalid workspace configuration")]
    Config,
}

impl ErrorKind {
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Create(_))
    }
}
