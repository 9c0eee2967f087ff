//! Service configuration.
//!
//! Configuration is built once at startup, from an optional TOML file and then
//! from environment overrides, validated, and passed by reference into the
//! pipeline. Nothing reads the environment after that.

use crate::compose::layout::LayoutPolicy;
use crate::core::error::ConfigError;
use crate::core::types::CornerStyle;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Bearer token passed to upstream requests.
///
/// An empty token means anonymous requests. The value never appears in
/// `Debug` output.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Credential(String);

impl Credential {
    /// Wrap a token.
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// The token, or `None` when anonymous.
    pub fn token(&self) -> Option<&str> {
        let token = self.0.trim();
        if token.is_empty() {
            None
        } else {
            Some(token)
        }
    }

    /// Value for an `Authorization` header.
    pub fn bearer_header(&self) -> Option<String> {
        self.token().map(|t| format!("Bearer {}", t))
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.token() {
            Some(_) => f.write_str("Credential(<redacted>)"),
            None => f.write_str("Credential(<anonymous>)"),
        }
    }
}

/// Repository whose collections are rendered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepositoryConfig {
    /// Account or organisation owning the repository.
    pub owner: String,
    /// Repository name.
    pub name: String,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            owner: "koddr".to_string(),
            name: "wonderful-readme-stats".to_string(),
        }
    }
}

/// HTTP server settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Interface to listen on.
    pub bind_address: String,
    /// TCP port.
    pub port: u16,
    /// Limit for receiving a request body.
    pub read_timeout_seconds: u64,
    /// Limit for producing a complete response.
    pub write_timeout_seconds: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: 8080,
            read_timeout_seconds: 5,
            write_timeout_seconds: 10,
        }
    }
}

impl ServerConfig {
    /// Request read timeout.
    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_seconds)
    }

    /// Response write timeout.
    pub fn write_timeout(&self) -> Duration {
        Duration::from_secs(self.write_timeout_seconds)
    }
}

/// One tracked collection, e.g. `stargazers`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionConfig {
    /// Collection name, used for the listing request and the served path.
    pub name: String,
    /// Mask style for this collection; falls back to the layout default.
    #[serde(default)]
    pub corner_style: Option<CornerStyle>,
}

impl CollectionConfig {
    /// Collection using the default corner style.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            corner_style: None,
        }
    }

    /// Override the corner style.
    pub fn with_corner_style(mut self, style: CornerStyle) -> Self {
        self.corner_style = Some(style);
        self
    }
}

/// Complete service configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Token for upstream requests.
    pub credential: Credential,
    /// Base URL of the listing API.
    pub api_base: String,
    /// Repository whose collections are rendered.
    pub repository: RepositoryConfig,
    /// HTTP server settings.
    pub server: ServerConfig,
    /// Grid and tile geometry shared by all collections.
    pub layout: LayoutPolicy,
    /// Normal delay between refresh cycles.
    pub refresh_interval_seconds: u64,
    /// Delay before the next cycle after a failed one.
    pub retry_interval_seconds: u64,
    /// Maximum simultaneous image pipelines.
    pub fetch_concurrency: usize,
    /// Per-request timeout.
    pub fetch_timeout_seconds: u64,
    /// Tracked collections, in serving order.
    pub collections: Vec<CollectionConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            credential: Credential::default(),
            api_base: "https://api.github.com".to_string(),
            repository: RepositoryConfig::default(),
            server: ServerConfig::default(),
            layout: LayoutPolicy::default(),
            refresh_interval_seconds: 3600,
            retry_interval_seconds: 300,
            fetch_concurrency: 8,
            fetch_timeout_seconds: 15,
            collections: vec![
                CollectionConfig::new("stargazers"),
                CollectionConfig::new("contributors"),
            ],
        }
    }
}

impl Config {
    /// Load a TOML file. Missing keys take their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|error| ConfigError::Read {
            path: path.display().to_string(),
            error,
        })?;
        Self::from_toml(&text)
    }

    /// Parse TOML text.
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Defaults overridden by the process environment, validated.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from the process environment.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary lookup (environment-shaped keys).
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(token) = lookup("GITHUB_TOKEN") {
            self.credential = Credential::new(token);
        }
        if let Some(base) = lookup("GITHUB_API_BASE") {
            self.api_base = base;
        }
        if let Some(owner) = lookup("REPOSITORY_OWNER") {
            self.repository.owner = owner;
        }
        if let Some(name) = lookup("REPOSITORY_NAME") {
            self.repository.name = name;
        }
        if let Some(address) = lookup("SERVER_BIND_ADDRESS") {
            self.server.bind_address = address;
        }
        override_parsed(&lookup, "SERVER_PORT", &mut self.server.port)?;
        override_parsed(&lookup, "SERVER_READ_TIMEOUT", &mut self.server.read_timeout_seconds)?;
        override_parsed(&lookup, "SERVER_WRITE_TIMEOUT", &mut self.server.write_timeout_seconds)?;
        override_parsed(&lookup, "AVATAR_SIZE", &mut self.layout.tile_size)?;
        override_parsed(&lookup, "AVATAR_HORIZONTAL_MARGIN", &mut self.layout.horizontal_margin)?;
        override_parsed(&lookup, "AVATAR_VERTICAL_MARGIN", &mut self.layout.vertical_margin)?;
        override_parsed(&lookup, "AVATAR_ROUNDED_RADIUS", &mut self.layout.corner_radius)?;
        override_parsed(&lookup, "AVATAR_SHAPE", &mut self.layout.corner_style)?;
        override_parsed(&lookup, "OUTPUT_IMAGE_MAX_PER_ROW", &mut self.layout.tiles_per_row)?;
        override_parsed(&lookup, "OUTPUT_IMAGE_MAX_ROWS", &mut self.layout.row_count)?;
        override_parsed(&lookup, "OUTPUT_IMAGE_UPDATE_INTERVAL", &mut self.refresh_interval_seconds)?;
        override_parsed(&lookup, "OUTPUT_IMAGE_RETRY_INTERVAL", &mut self.retry_interval_seconds)?;
        override_parsed(&lookup, "FETCH_CONCURRENCY", &mut self.fetch_concurrency)?;
        override_parsed(&lookup, "FETCH_TIMEOUT", &mut self.fetch_timeout_seconds)?;
        Ok(())
    }

    /// Check every field against its allowed range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.layout.validate()?;

        if self.refresh_interval_seconds == 0 {
            return Err(ConfigError::invalid("refresh_interval_seconds", "must be > 0"));
        }
        if self.retry_interval_seconds == 0 {
            return Err(ConfigError::invalid("retry_interval_seconds", "must be > 0"));
        }
        if self.fetch_concurrency == 0 {
            return Err(ConfigError::invalid("fetch_concurrency", "must be > 0"));
        }
        if self.fetch_timeout_seconds == 0 {
            return Err(ConfigError::invalid("fetch_timeout_seconds", "must be > 0"));
        }
        if self.server.read_timeout_seconds == 0 {
            return Err(ConfigError::invalid("server.read_timeout_seconds", "must be > 0"));
        }
        if self.server.write_timeout_seconds == 0 {
            return Err(ConfigError::invalid("server.write_timeout_seconds", "must be > 0"));
        }
        if self.collections.is_empty() {
            return Err(ConfigError::invalid("collections", "must name at least one collection"));
        }

        let mut seen = HashSet::new();
        for collection in &self.collections {
            let name = collection.name.trim();
            if name.is_empty() || name.contains('/') {
                return Err(ConfigError::invalid(
                    "collections",
                    "names must be non-empty path segments",
                ));
            }
            if !seen.insert(name) {
                return Err(ConfigError::Invalid {
                    field: "collections".to_string(),
                    reason: format!("'{}' is listed twice", name),
                });
            }
        }

        Ok(())
    }

    /// Normal refresh cadence.
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_seconds)
    }

    /// Shortened delay after a failed cycle.
    pub fn retry_interval(&self) -> Duration {
        Duration::from_secs(self.retry_interval_seconds)
    }

    /// Per-request timeout.
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_seconds)
    }

    /// Layout policy for one collection, with its corner style override.
    pub fn layout_for(&self, collection: &CollectionConfig) -> LayoutPolicy {
        let mut policy = self.layout.clone();
        if let Some(style) = collection.corner_style {
            policy.corner_style = style;
        }
        policy
    }
}

fn override_parsed<T, F>(lookup: &F, key: &str, target: &mut T) -> Result<(), ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    if let Some(value) = lookup(key) {
        *target = value.trim().parse().map_err(|_| ConfigError::InvalidEnv {
            key: key.to_string(),
            value,
        })?;
    }
    Ok(())
}
