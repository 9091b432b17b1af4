//! Downloading a URL to a local file.

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use std::fs;
use std::io::{self, Read};
use std::path::Path;
use std::sync::Arc;
use tracing::instrument;

/// Permissions given to a downloaded file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FileMode {
    /// Owner read/write (`0600`).
    #[default]
    Data,
    /// Owner read/write/execute (`0700`), for the downloaded compiler.
    Executable,
}

impl FileMode {
    pub fn bits(&self) -> u32 {
        match self {
            Self::Data => 0o600,
            Self::Executable => 0o700,
        }
    }
}

/// Something that can put the body of a URL into a file.
///
/// Implementations must not leave a truncated file behind on failure: either
/// the destination holds the complete body, or it is left exactly as it was.
pub trait Fetch {
    /// Download `url` into `dest` (overwriting it) and return the number of
    /// bytes written.
    fn fetch(&self, url: &str, dest: &Path, mode: FileMode) -> Result<u64>;
}

pub type FetchHandle = Arc<dyn Fetch + Send + Sync>;

/// Plain HTTP(S) GET with no custom headers, authentication or retries.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::blocking::Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .build()
            .or_raise(|| ErrorKind::Client)?;
        Ok(Self { client })
    }
}

impl Fetch for HttpFetcher {
    #[instrument(skip(self), fields(dest = %dest.display()))]
    fn fetch(&self, url: &str, dest: &Path, mode: FileMode) -> Result<u64> {
        let failed = || ErrorKind::Fetch(url.to_string());
        tracing::debug!("Sending request");
        let mut response = self
            .client
            .get(url)
            .send()
            .or_raise(failed)?
            .error_for_status()
            .or_raise(failed)?;
        tracing::debug!(status = %response.status(), length = ?response.content_length(), "Response received");
        let written = write_body(&mut response, dest, mode).or_raise(failed)?;
        tracing::info!(bytes = written, "Downloaded");
        Ok(written)
    }
}

/// Stream `body` into `dest`, creating its parent directory when missing.
///
/// The body goes to a temporary file next to `dest` that is renamed over it
/// once complete, so a failure mid-stream leaves any previous `dest` intact.
pub(crate) fn write_body(body: &mut impl Read, dest: &Path, mode: FileMode) -> Result<u64> {
    let write_failed = || ErrorKind::Write(dest.to_path_buf());
    let parent = dest.parent().filter(|parent| !parent.as_os_str().is_empty()).unwrap_or(Path::new("."));
    fs::create_dir_all(parent).or_raise(write_failed)?;

    let mut partial = tempfile::Builder::new()
        .prefix(".download-")
        .tempfile_in(parent)
        .or_raise(write_failed)?;
    let written = io::copy(body, partial.as_file_mut()).or_raise(write_failed)?;
    partial.as_file().sync_all().or_raise(write_failed)?;
    set_mode(partial.path(), mode).or_raise(write_failed)?;

    if dest.exists() {
        tracing::debug!(dest = %dest.display(), "Overwriting existing file");
    }
    partial.persist(dest).map_err(|err| err.error).or_raise(write_failed)?;
    Ok(written)
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: FileMode) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode.bits()))
}

#[cfg(not(unix))]
fn set_mode(_path: &Path, _mode: FileMode) -> io::Result<()> {
    Ok(())
}

#[cfg(any(test, feature = "mock"))]
pub use mock::MockFetcher;

#[cfg(any(test, feature = "mock"))]
mod mock {
    use super::{Fetch, FileMode, write_body};
    use crate::error::{ErrorKind, Result};
    use exn::ResultExt;
    use std::collections::HashMap;
    use std::path::Path;
    use std::sync::{Mutex, PoisonError};

    /// In-memory fetcher: serves canned bodies and records every URL asked
    /// for. Unknown URLs fail like an unreachable host.
    #[derive(Debug, Default)]
    pub struct MockFetcher {
        responses: HashMap<String, Vec<u8>>,
        requests: Mutex<Vec<String>>,
    }

    impl MockFetcher {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_response(mut self, url: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
            self.responses.insert(url.into(), body.into());
            self
        }

        /// URLs requested so far, in order.
        pub fn requests(&self) -> Vec<String> {
            self.requests.lock().unwrap_or_else(PoisonError::into_inner).clone()
        }
    }

    impl Fetch for MockFetcher {
        fn fetch(&self, url: &str, dest: &Path, mode: FileMode) -> Result<u64> {
            self.requests
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(url.to_string());
            let Some(body) = self.responses.get(url) else {
                exn::bail!(ErrorKind::Fetch(url.to_string()));
            };
            write_body(&mut body.as_slice(), dest, mode).or_raise(|| ErrorKind::Fetch(url.to_string()))
        }
    }
}
