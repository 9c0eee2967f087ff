//! Grid composition.
//!
//! This module turns an ordered list of prepared tiles into one composite.

pub mod grid;
pub mod layout;

pub use grid::{compose, Composite};
pub use layout::{LayoutPolicy, LayoutSpec};
