//! Paints prepared tiles onto one composite raster.

use crate::compose::layout::{LayoutPolicy, LayoutSpec};
use crate::core::types::Raster;
use image::{ImageFormat, RgbaImage};
use std::io::Cursor;
use std::time::SystemTime;

/// A finished collage.
///
/// Built wholesale by [`compose`] and never mutated afterwards; publication
/// wraps it in an `Arc`.
#[derive(Debug, Clone)]
pub struct Composite {
    image: RgbaImage,
    layout: LayoutSpec,
    built_at: SystemTime,
}

impl Composite {
    /// The composite pixels.
    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    /// Geometry used to build this composite.
    pub fn layout(&self) -> &LayoutSpec {
        &self.layout
    }

    /// Number of tiles painted.
    pub fn tile_count(&self) -> usize {
        self.layout.item_count
    }

    /// When composition finished.
    pub fn built_at(&self) -> SystemTime {
        self.built_at
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Encode as PNG.
    pub fn encode_png(&self) -> Result<Vec<u8>, image::ImageError> {
        let mut buffer = Cursor::new(Vec::new());
        self.image.write_to(&mut buffer, ImageFormat::Png)?;
        Ok(buffer.into_inner())
    }
}

/// Lay `tiles` out on the grid derived from `policy`.
///
/// Tiles must already be `tile_size` squares; the collector guarantees this by
/// resizing before masking. Tiles beyond the policy capacity are dropped.
/// Source pixels replace destination pixels, they are not blended.
pub fn compose(tiles: &[Raster], policy: &LayoutPolicy) -> Composite {
    let layout = LayoutSpec::derive(policy, tiles.len());
    let mut image = RgbaImage::new(layout.width(), layout.height());

    for (index, tile) in tiles.iter().take(layout.item_count).enumerate() {
        debug_assert_eq!(
            tile.dimensions(),
            (layout.tile_size, layout.tile_size),
            "tile {} has the wrong size",
            index
        );
        let (x, y) = layout.tile_origin(index);
        image::imageops::replace(&mut image, tile, i64::from(x), i64::from(y));
    }

    log::debug!(
        "composed {} tile(s) into {}x{} ({} per row, {} row(s))",
        layout.item_count,
        layout.width(),
        layout.height(),
        layout.tiles_per_row,
        layout.row_count
    );

    Composite {
        image,
        layout,
        built_at: SystemTime::now(),
    }
}
