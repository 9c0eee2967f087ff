//! Core types, configuration and errors shared by the collage pipeline.
//!
//! This module contains:
//! - Value types (sources, raw bytes, rasters, corner styles)
//! - Service configuration
//! - Error types

pub mod config;
pub mod error;
pub mod types;

// Re-export commonly used types
pub use config::{CollectionConfig, Config, Credential};
pub use error::{
    CollectError, ConfigError, DecodeError, FetchError, ItemError, ListingError, ServeError,
    StargridError,
};
pub use types::{CornerStyle, ImageSource, Raster, RawImage};
