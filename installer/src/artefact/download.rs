//! Artefact retrieval.
//!
//! Provides a trait-based abstraction for fetching artefact bytes, enabling
//! dependency injection for testing. The production fetcher speaks HTTP(S)
//! through `ureq` and also reads `file://` URLs and plain paths so that
//! offline installs can point a manifest at local archives.

use log::debug;
use std::io::Read;
use std::path::Path;
use std::sync::OnceLock;
use std::time::Duration;

/// Network timeout for a single artefact download.
const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(120);

/// Trait for fetching artefact bytes from a URL.
///
/// Implementations return the whole payload or a transport failure. Retries,
/// caching, and mirrors are the implementation's concern, not the caller's.
#[cfg_attr(test, mockall::automock)]
pub trait Fetcher {
    /// Fetch the bytes behind `url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the transfer fails or the resource is missing.
    fn fetch(&self, url: &str) -> Result<Vec<u8>, DownloadError>;
}

/// Errors arising from artefact retrieval.
#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    /// HTTP request failed.
    #[error("download failed for {url}: {reason}")]
    HttpError {
        /// The URL that was requested.
        url: String,
        /// A human-readable description of the failure.
        reason: String,
    },

    /// The requested artefact was not found (HTTP 404 or missing file).
    #[error("artefact not found: {url}")]
    NotFound {
        /// The URL that returned 404.
        url: String,
    },

    /// I/O error while reading the payload.
    #[error("I/O error reading {url}: {source}")]
    Io {
        /// The URL being read.
        url: String,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },
}

/// Fetcher backed by `ureq` for remote URLs and the filesystem for local
/// ones.
///
/// # Examples
///
/// ```
/// use tarts_installer::artefact::download::{Fetcher, HttpFetcher};
///
/// let dir = tempfile::tempdir().unwrap();
/// let path = dir.path().join("payload.bin");
/// std::fs::write(&path, b"payload").unwrap();
///
/// let bytes = HttpFetcher.fetch(path.to_str().unwrap()).unwrap();
/// assert_eq!(bytes, b"payload");
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct HttpFetcher;

impl Fetcher for HttpFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, DownloadError> {
        if is_remote(url) {
            debug!("fetching {url} over HTTP");
            return download_bytes(url);
        }
        let path = url.strip_prefix("file://").unwrap_or(url);
        debug!("reading artefact from local path {path}");
        read_local(url, Path::new(path))
    }
}

/// Whether `url` needs the HTTP client.
fn is_remote(url: &str) -> bool {
    url.starts_with("https://") || url.starts_with("http://")
}

/// Download a URL and return the body bytes.
fn download_bytes(url: &str) -> Result<Vec<u8>, DownloadError> {
    let response = http_agent()
        .get(url)
        .call()
        .map_err(|e| map_ureq_error(url, &e))?;
    let mut body = response.into_body();
    let mut bytes = Vec::new();
    body.as_reader()
        .read_to_end(&mut bytes)
        .map_err(|source| DownloadError::Io {
            url: url.to_owned(),
            source,
        })?;
    Ok(bytes)
}

/// Read a local artefact.
fn read_local(url: &str, path: &Path) -> Result<Vec<u8>, DownloadError> {
    std::fs::read(path).map_err(|source| {
        if source.kind() == std::io::ErrorKind::NotFound {
            DownloadError::NotFound {
                url: url.to_owned(),
            }
        } else {
            DownloadError::Io {
                url: url.to_owned(),
                source,
            }
        }
    })
}

/// Shared `ureq` agent with request timeout configuration.
fn http_agent() -> &'static ureq::Agent {
    static AGENT: OnceLock<ureq::Agent> = OnceLock::new();
    AGENT.get_or_init(|| {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(DOWNLOAD_TIMEOUT))
            .build();
        ureq::Agent::new_with_config(config)
    })
}

/// Map a ureq error to a [`DownloadError`].
fn map_ureq_error(url: &str, err: &ureq::Error) -> DownloadError {
    match err {
        ureq::Error::StatusCode(404) => DownloadError::NotFound {
            url: url.to_owned(),
        },
        other => DownloadError::HttpError {
            url: url.to_owned(),
            reason: other.to_string(),
        },
    }
}
