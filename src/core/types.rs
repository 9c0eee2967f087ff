//! Core value types that flow through the collage pipeline.
//!
//! Rasters are plain `image::RgbaImage` buffers. Each stage takes ownership of
//! the raster it is given and hands a new one to the next stage, so there is no
//! shared pixel data until a composite is published.

use image::RgbaImage;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Decoded pixel buffer with per-pixel RGBA, alpha significant.
pub type Raster = RgbaImage;

/// One remote image to fetch.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageSource {
    /// Absolute URL of the image.
    pub url: String,
}

impl ImageSource {
    /// Create a new source from a URL.
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

impl From<&str> for ImageSource {
    fn from(url: &str) -> Self {
        Self::new(url)
    }
}

impl fmt::Display for ImageSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.url)
    }
}

/// Undecoded bytes returned by a fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawImage {
    /// Response body.
    pub bytes: Vec<u8>,
    /// Value of the `Content-Type` header, if the server sent one.
    pub content_type: Option<String>,
}

impl RawImage {
    /// Create a raw image from a body and an optional content type.
    pub fn new(bytes: Vec<u8>, content_type: Option<String>) -> Self {
        Self { bytes, content_type }
    }

    /// Size of the body in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Check if the body is empty.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Shape mask applied to every tile.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CornerStyle {
    /// Rectangle with rounded corners of a configured radius.
    #[default]
    Rounded,
    /// Disk inscribed in the tile.
    Circular,
}

impl CornerStyle {
    /// Lowercase name used in configuration.
    pub fn as_str(&self) -> &'static str {
        match self {
            CornerStyle::Rounded => "rounded",
            CornerStyle::Circular => "circular",
        }
    }
}

impl fmt::Display for CornerStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CornerStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rounded" => Ok(CornerStyle::Rounded),
            "circular" => Ok(CornerStyle::Circular),
            other => Err(format!("unknown corner style '{}'", other)),
        }
    }
}
