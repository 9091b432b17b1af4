//! Remote repositories and the packages inside them.
//!
//! [`RepositoryCache`] mirrors the configured netkan/ckan repository archives
//! into a local directory through a [`Fetch`] implementation, [`find`] looks
//! packages up by name in a mirrored (or local) tree, and [`PackageInfo`]
//! reads what `kure get --info` prints.

mod cache;
pub mod error;
mod fetch;
mod locate;
mod package;

pub use crate::cache::{RepositoryCache, RepositoryDescriptor, SkippedRepository, SyncReport};
#[cfg(any(test, feature = "mock"))]
pub use crate::fetch::MockFetcher;
pub use crate::fetch::{Fetch, FetchHandle, FileMode, HttpFetcher};
pub use crate::locate::{SearchMode, find};
pub use crate::package::{PackageInfo, remote_reference};
