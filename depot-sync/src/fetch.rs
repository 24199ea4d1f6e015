//! Remote byte sources for a sync session.
//!
//! [`HttpFetcher`] GETs `base_url + path` with bounded timeouts and a small
//! retry budget. [`DirFetcher`] reads the same layout from a local directory
//! (a mounted share or a `file://` remote).

use std::io::{ErrorKind, Read};
use std::path::PathBuf;
use std::thread::sleep;
use std::time::Duration;

use url::Url;

use depot_core::{types::local_path, RemoteConfig};

use crate::error::FetchError;

/// Connect timeout for HTTP requests.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Fetches the remote manifest and individual files by relative path.
///
/// Implementations are shared across download worker threads.
pub trait RemoteFetcher: Send + Sync {
    fn fetch_manifest(&self) -> Result<Vec<u8>, FetchError>;

    /// Fetch `base + relative_path`, where `relative_path` is a manifest `fullPath`.
    fn fetch_file(&self, relative_path: &str) -> Result<Vec<u8>, FetchError>;
}

// ---------------------------------------------------------------------------
// HTTP
// ---------------------------------------------------------------------------

/// HTTP GET transport backed by a shared `ureq::Agent`.
pub struct HttpFetcher {
    agent: ureq::Agent,
    base: Url,
    manifest: String,
    retries: u32,
    retry_delay: Duration,
}

impl HttpFetcher {
    /// Build a fetcher for `base_url` using the timeouts and retry budget in `config`.
    pub fn new(base_url: &str, config: &RemoteConfig) -> Result<Self, FetchError> {
        let base = parse_base(base_url)?;
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(CONNECT_TIMEOUT)
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build();
        Ok(Self {
            agent,
            base,
            manifest: config.manifest.clone(),
            retries: config.retries,
            retry_delay: Duration::from_millis(config.retry_delay_ms),
        })
    }

    /// Full URL for a `/`-separated path relative to the base.
    pub fn url_for(&self, relative_path: &str) -> Result<Url, FetchError> {
        join_url(&self.base, relative_path)
    }

    fn get(&self, relative_path: &str) -> Result<Vec<u8>, FetchError> {
        let url = self.url_for(relative_path)?;
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match self.get_once(&url) {
                Ok(bytes) => return Ok(bytes),
                Err(err) if attempt <= self.retries && is_retryable(&err) => {
                    tracing::warn!("attempt {attempt} failed, retrying: {err}");
                    sleep(self.retry_delay * attempt);
                }
                Err(err) => return Err(err),
            }
        }
    }

    fn get_once(&self, url: &Url) -> Result<Vec<u8>, FetchError> {
        tracing::debug!("GET {url}");
        match self.agent.request_url("GET", url).call() {
            Ok(response) => {
                let mut bytes = Vec::new();
                response
                    .into_reader()
                    .read_to_end(&mut bytes)
                    .map_err(|e| FetchError::Transport {
                        url: url.to_string(),
                        message: format!("failed to read body: {e}"),
                    })?;
                Ok(bytes)
            }
            Err(ureq::Error::Status(status, _)) => Err(FetchError::Status {
                url: url.to_string(),
                status,
            }),
            Err(ureq::Error::Transport(transport)) => Err(FetchError::Transport {
                url: url.to_string(),
                message: transport.to_string(),
            }),
        }
    }
}

impl RemoteFetcher for HttpFetcher {
    fn fetch_manifest(&self) -> Result<Vec<u8>, FetchError> {
        self.get(&self.manifest)
    }

    fn fetch_file(&self, relative_path: &str) -> Result<Vec<u8>, FetchError> {
        self.get(relative_path)
    }
}

/// Transport failures and server errors are worth another attempt; client
/// errors (404, 403, …) are not.
fn is_retryable(err: &FetchError) -> bool {
    match err {
        FetchError::Transport { .. } => true,
        FetchError::Status { status, .. } => *status >= 500,
        FetchError::InvalidUrl { .. } => false,
    }
}

fn parse_base(base_url: &str) -> Result<Url, FetchError> {
    let invalid = |reason: String| FetchError::InvalidUrl {
        url: base_url.to_owned(),
        reason,
    };
    let base = Url::parse(base_url).map_err(|e| invalid(e.to_string()))?;
    if base.cannot_be_a_base() {
        return Err(invalid("cannot be a base URL".to_owned()));
    }
    Ok(base)
}

/// Append each segment of `relative_path` to `base`, percent-encoding as needed.
pub fn join_url(base: &Url, relative_path: &str) -> Result<Url, FetchError> {
    let mut url = base.clone();
    {
        let mut segments = url.path_segments_mut().map_err(|()| FetchError::InvalidUrl {
            url: base.to_string(),
            reason: "cannot be a base URL".to_owned(),
        })?;
        segments.pop_if_empty();
        segments.extend(relative_path.split('/').filter(|s| !s.is_empty()));
    }
    Ok(url)
}

// ---------------------------------------------------------------------------
// Local directory
// ---------------------------------------------------------------------------

/// Reads the published layout straight from a directory.
#[derive(Debug, Clone)]
pub struct DirFetcher {
    root: PathBuf,
    manifest: String,
}

impl DirFetcher {
    pub fn new(root: impl Into<PathBuf>, manifest: &str) -> Self {
        Self {
            root: root.into(),
            manifest: manifest.to_owned(),
        }
    }

    fn read(&self, relative_path: &str) -> Result<Vec<u8>, FetchError> {
        let path = local_path(&self.root, relative_path);
        std::fs::read(&path).map_err(|e| {
            let url = path.display().to_string();
            if e.kind() == ErrorKind::NotFound {
                FetchError::Status { url, status: 404 }
            } else {
                FetchError::Transport {
                    url,
                    message: e.to_string(),
                }
            }
        })
    }
}

impl RemoteFetcher for DirFetcher {
    fn fetch_manifest(&self) -> Result<Vec<u8>, FetchError> {
        self.read(&self.manifest)
    }

    fn fetch_file(&self, relative_path: &str) -> Result<Vec<u8>, FetchError> {
        self.read(relative_path)
    }
}

/// Pick a transport for `base_url`: `file://` URLs read from disk, anything
/// else goes over HTTP.
pub fn fetcher_for(
    base_url: &str,
    config: &RemoteConfig,
) -> Result<Box<dyn RemoteFetcher>, FetchError> {
    let base = parse_base(base_url)?;
    if base.scheme() == "file" {
        let dir = base.to_file_path().map_err(|()| FetchError::InvalidUrl {
            url: base_url.to_owned(),
            reason: "not a local path".to_owned(),
        })?;
        return Ok(Box::new(DirFetcher::new(dir, &config.manifest)));
    }
    Ok(Box::new(HttpFetcher::new(base_url, config)?))
}
