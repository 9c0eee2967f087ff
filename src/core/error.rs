//! Error types for Stargrid.
//!
//! Uses thiserror for structured errors with context. Errors are designed to:
//! - Identify which item of a batch failed (index and URL)
//! - Separate transport problems from decoding problems
//! - Convert into one top-level type for the binary

use thiserror::Error;

/// Top-level error type for Stargrid.
///
/// This enum encompasses all error categories and enables automatic
/// conversion between specific error types.
#[derive(Error, Debug)]
pub enum StargridError {
    /// Retrieving a remote image failed.
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// Fetched bytes were not a usable image.
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    /// A fan-out run failed.
    #[error("Collect error: {0}")]
    Collect(#[from] CollectError),

    /// The listing provider failed.
    #[error("Listing error: {0}")]
    Listing(#[from] ListingError),

    /// Configuration could not be loaded or is invalid.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A composite could not be served.
    #[error("Serve error: {0}")]
    Serve(#[from] ServeError),

    /// Filesystem or socket failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Encoding a composite failed.
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
}

/// Errors from retrieving one remote image.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// No complete response within the timeout.
    #[error("request to {url} timed out")]
    Timeout {
        /// Requested URL.
        url: String,
    },

    /// The connection could not be made or broke off.
    #[error("connection to {url} failed: {reason}")]
    ConnectionFailed {
        /// Requested URL.
        url: String,
        /// Transport error text.
        reason: String,
    },

    /// The server answered with a non-success status.
    #[error("{url} answered with HTTP {code}")]
    HttpStatus {
        /// Requested URL.
        url: String,
        /// HTTP status code.
        code: u16,
    },
}

/// Errors from turning fetched bytes into a raster.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Neither the bytes nor the content type name a supported format.
    #[error("unsupported image format{}", .content_type.as_deref().map(|c| format!(" ({c})")).unwrap_or_default())]
    UnsupportedFormat {
        /// Content type reported by the server, if any.
        content_type: Option<String>,
    },

    /// The format is known but the data does not decode.
    #[error("corrupt image data: {0}")]
    Corrupt(String),
}

/// Why a single pipeline of a fan-out failed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ItemError {
    /// The fetch step failed.
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// The decode step failed.
    #[error(transparent)]
    Decode(#[from] DecodeError),
}

/// Errors from a fan-out collection run.
///
/// The collector is fail-fast, so only the first observed item failure is
/// reported.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CollectError {
    /// One item's pipeline failed.
    #[error("item {index} ({url}) failed: {source}")]
    Item {
        /// Position of the item in the input.
        index: usize,
        /// Source URL of the item.
        url: String,
        /// What went wrong.
        #[source]
        source: ItemError,
    },

    /// The per-run thread pool could not be built.
    #[error("failed to build worker pool: {0}")]
    WorkerPool(String),

    /// Some pipelines finished without reporting.
    #[error("{missing} pipeline(s) never reported a result")]
    Incomplete {
        /// Number of unreported pipelines.
        missing: usize,
    },
}

impl CollectError {
    /// Index of the failing item, if the failure belongs to one.
    pub fn index(&self) -> Option<usize> {
        match self {
            CollectError::Item { index, .. } => Some(*index),
            _ => None,
        }
    }

    /// Check if the failure came from the network rather than from decoding.
    pub fn is_network(&self) -> bool {
        matches!(
            self,
            CollectError::Item {
                source: ItemError::Fetch(_),
                ..
            }
        )
    }
}

/// Errors from the listing provider.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ListingError {
    /// The upstream does not know this collection.
    #[error("unknown collection '{0}'")]
    UnknownCollection(String),

    /// The listing request itself failed.
    #[error("listing request failed: {0}")]
    Request(#[from] FetchError),

    /// The response body was not the expected JSON.
    #[error("malformed listing response from {url}: {reason}")]
    Malformed {
        /// Requested page URL.
        url: String,
        /// Parser error text.
        reason: String,
    },
}

/// Errors from loading or validating configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read {path}: {error}")]
    Read {
        /// File path.
        path: String,
        /// Underlying I/O error.
        error: std::io::Error,
    },

    /// The configuration file is not valid TOML for [`crate::core::config::Config`].
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// An environment override does not parse.
    #[error("invalid value '{value}' for {key}")]
    InvalidEnv {
        /// Variable name.
        key: String,
        /// Raw value.
        value: String,
    },

    /// A field is out of its allowed range.
    #[error("invalid configuration: {field} {reason}")]
    Invalid {
        /// Dotted field path.
        field: String,
        /// What the field must satisfy.
        reason: String,
    },
}

impl ConfigError {
    pub(crate) fn invalid(field: &str, reason: &str) -> Self {
        ConfigError::Invalid {
            field: field.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Errors raised while serving a composite.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServeError {
    /// No slot exists under this name.
    #[error("unknown collection '{0}'")]
    UnknownCollection(String),

    /// The slot exists but nothing was published yet.
    #[error("no image has been published for '{0}' yet")]
    NotReady(String),
}

/// Result type alias for Stargrid operations.
pub type StargridResult<T> = Result<T, StargridError>;

/// Result type alias for fan-out collection.
pub type CollectResult<T> = Result<T, CollectError>;
