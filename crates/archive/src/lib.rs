//! Repository tarballs in and out.
//!
//! - [`unpack`] streams a (gzip, bzip2 or bare) tarball into a directory,
//!   restoring modes and timestamps and refusing entries that escape it.
//! - [`pack`] builds the tarball that `kure serve` hands to CKAN clients.
//! - [`confine`] is the path normaliser both of them (and the repository
//!   cache) rely on.

mod compression;
pub mod error;
mod pack;
mod path;
mod unpack;

pub use crate::compression::{Compression, Encoder};
pub use crate::pack::pack;
pub use crate::path::{confine, confine_name};
pub use crate::unpack::{UnpackStats, unpack};
