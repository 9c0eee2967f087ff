//! Raster transforms applied to each tile before composition.

pub mod transform;

pub use transform::{apply_mask, prepare_tile, resize};
