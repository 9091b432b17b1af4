//! Turning `local/netkan` sources into `.ckan` packages with the external
//! `netkan.exe` compiler.

mod batch;
mod compiler;
pub mod error;

pub use crate::batch::{BuildFailure, BuildReport, build, sources};
pub use crate::compiler::{CompileOptions, CompileOutput, Compiler, NetkanExe};
