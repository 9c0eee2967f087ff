//! Execution of the per-source pipelines.
//!
//! This module handles the concurrent fan-out and ordered fan-in of tiles.

pub mod collector;

pub use collector::{CollectStats, FanOutCollector, DEFAULT_CONCURRENCY};
