//! Command Error Types
//!
//! Library errors are re-raised into these kinds so the printed error tree
//! starts with what the user was trying to do.

use derive_more::{Display, Error};
use std::path::PathBuf;

pub type Error = exn::Exn<ErrorKind>;
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The command line makes no sense for the current state (bad index, etc).
    #[display("{_0}")]
    Usage(#[error(not(source))] String),
    #[display("could not create workspace")]
    Init,
    #[display("you can run this command only from a workspace")]
    Workspace,
    #[display("could not set up the HTTP client")]
    Client,
    #[display("could not update repositories")]
    Update,
    #[display("could not download the compiler")]
    Compiler,
    #[display("could not search the repository cache")]
    Search,
    #[display("could not read {}", _0.display())]
    Read(#[error(not(source))] PathBuf),
    #[display("could not save package to {}", _0.display())]
    Save(#[error(not(source))] PathBuf),
    #[display("could not read answer from the terminal")]
    Prompt,
    #[display("could not start the build")]
    BuildSetup,
    #[display("{_0} package(s) failed to build")]
    Build(#[error(not(source))] usize),
    #[display("could not pack {}", _0.display())]
    Pack(#[error(not(source))] PathBuf),
    #[display("could not serve on port {_0}")]
    Serve(#[error(not(source))] u16),
}

impl ErrorKind {
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Update | Self::Compiler)
    }
}
