//! Retrieval of raw image bytes.
//!
//! [`SourceFetcher`] is the seam the collector depends on; [`HttpFetcher`] is
//! the ureq-backed implementation used in production. Fetchers never retry.

use crate::core::config::{Config, Credential};
use crate::core::error::FetchError;
use crate::core::types::RawImage;
use std::io::{self, Read};
use std::time::Duration;

/// Largest accepted response body.
pub const MAX_IMAGE_BYTES: u64 = 10 * 1024 * 1024;

/// Fetches the bytes behind one URL.
pub trait SourceFetcher: Send + Sync {
    /// Perform exactly one request for `url`.
    fn fetch(&self, url: &str) -> Result<RawImage, FetchError>;
}

/// Blocking HTTP fetcher with a per-request timeout and optional bearer token.
#[derive(Clone)]
pub struct HttpFetcher {
    agent: ureq::Agent,
    credential: Credential,
    max_bytes: u64,
}

impl std::fmt::Debug for HttpFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpFetcher")
            .field("credential", &self.credential)
            .field("max_bytes", &self.max_bytes)
            .finish()
    }
}

impl HttpFetcher {
    /// Create a fetcher whose requests give up after `timeout`.
    pub fn new(timeout: Duration, credential: Credential) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(timeout)
            .timeout(timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build();
        Self {
            agent,
            credential,
            max_bytes: MAX_IMAGE_BYTES,
        }
    }

    /// Create a fetcher from the service configuration.
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.fetch_timeout(), config.credential.clone())
    }

    /// Set the body size limit.
    pub fn with_max_bytes(mut self, max_bytes: u64) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    /// Issue a GET and map every failure onto [`FetchError`].
    ///
    /// Non-2xx answers become [`FetchError::HttpStatus`].
    pub(crate) fn get(&self, url: &str) -> Result<ureq::Response, FetchError> {
        let mut request = self.agent.get(url);
        if let Some(header) = self.credential.bearer_header() {
            request = request.set("Authorization", &header);
        }

        match request.call() {
            Ok(response) => Ok(response),
            Err(ureq::Error::Status(code, _)) => Err(FetchError::HttpStatus {
                url: url.to_string(),
                code,
            }),
            Err(ureq::Error::Transport(transport)) => Err(classify_transport(url, &transport)),
        }
    }
}

impl SourceFetcher for HttpFetcher {
    fn fetch(&self, url: &str) -> Result<RawImage, FetchError> {
        let response = self.get(url)?;
        let content_type = response.header("Content-Type").map(str::to_string);

        let mut bytes = Vec::new();
        response
            .into_reader()
            .take(self.max_bytes + 1)
            .read_to_end(&mut bytes)
            .map_err(|error| classify_io(url, &error))?;

        if bytes.len() as u64 > self.max_bytes {
            return Err(FetchError::ConnectionFailed {
                url: url.to_string(),
                reason: format!("body exceeds {} bytes", self.max_bytes),
            });
        }

        log::trace!("fetched {} ({} bytes)", url, bytes.len());
        Ok(RawImage::new(bytes, content_type))
    }
}

fn classify_transport(url: &str, transport: &ureq::Transport) -> FetchError {
    let mut cause: Option<&(dyn std::error::Error + 'static)> =
        std::error::Error::source(transport);
    while let Some(error) = cause {
        if let Some(io_error) = error.downcast_ref::<io::Error>() {
            if is_timeout(io_error.kind()) {
                return FetchError::Timeout {
                    url: url.to_string(),
                };
            }
        }
        cause = error.source();
    }

    FetchError::ConnectionFailed {
        url: url.to_string(),
        reason: transport.to_string(),
    }
}

fn classify_io(url: &str, error: &io::Error) -> FetchError {
    if is_timeout(error.kind()) {
        FetchError::Timeout {
            url: url.to_string(),
        }
    } else {
        FetchError::ConnectionFailed {
            url: url.to_string(),
            reason: error.to_string(),
        }
    }
}

fn is_timeout(kind: io::ErrorKind) -> bool {
    matches!(kind, io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock)
}
