//! Grid geometry.
//!
//! A [`LayoutPolicy`] holds the configured maxima. Each composition derives a
//! [`LayoutSpec`] from the policy and the number of tiles it actually has, so a
//! short listing produces a smaller image instead of empty rows.

use crate::core::error::ConfigError;
use crate::core::types::CornerStyle;
use serde::{Deserialize, Serialize};

/// Largest accepted composite edge in pixels.
pub const MAX_COMPOSITE_SIDE: u32 = 8192;

/// Configured placement policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutPolicy {
    /// Edge length of each square tile in pixels.
    pub tile_size: u32,
    /// Maximum tiles per row.
    pub tiles_per_row: u32,
    /// Maximum number of rows.
    pub row_count: u32,
    /// Gap between columns.
    pub horizontal_margin: u32,
    /// Gap between rows.
    pub vertical_margin: u32,
    /// Tile mask.
    pub corner_style: CornerStyle,
    /// Corner radius for [`CornerStyle::Rounded`].
    pub corner_radius: f32,
}

impl Default for LayoutPolicy {
    fn default() -> Self {
        Self {
            tile_size: 64,
            tiles_per_row: 16,
            row_count: 2,
            horizontal_margin: 12,
            vertical_margin: 12,
            corner_style: CornerStyle::Rounded,
            corner_radius: 16.0,
        }
    }
}

impl LayoutPolicy {
    /// Maximum number of tiles in one composite.
    pub fn capacity(&self) -> usize {
        self.tiles_per_row as usize * self.row_count as usize
    }

    /// Check the policy for values that cannot produce a grid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tile_size == 0 {
            return Err(ConfigError::invalid("layout.tile_size", "must be > 0"));
        }
        if self.tiles_per_row == 0 {
            return Err(ConfigError::invalid("layout.tiles_per_row", "must be > 0"));
        }
        if self.row_count == 0 {
            return Err(ConfigError::invalid("layout.row_count", "must be > 0"));
        }
        if !self.corner_radius.is_finite() || self.corner_radius < 0.0 {
            return Err(ConfigError::invalid(
                "layout.corner_radius",
                "must be a finite number >= 0",
            ));
        }

        // Every derived grid is at most the full grid, so bounding it here
        // keeps all later geometry arithmetic in range.
        let width = grid_extent(self.tiles_per_row, self.tile_size, self.horizontal_margin);
        let height = grid_extent(self.row_count, self.tile_size, self.vertical_margin);
        let fits = match (width, height) {
            (Some(w), Some(h)) => {
                w <= MAX_COMPOSITE_SIDE
                    && h <= MAX_COMPOSITE_SIDE
                    && (w as usize)
                        .checked_mul(h as usize)
                        .and_then(|pixels| pixels.checked_mul(4))
                        .is_some()
            }
            _ => false,
        };
        if !fits {
            return Err(ConfigError::Invalid {
                field: "layout".to_string(),
                reason: format!(
                    "full grid must fit in {0}x{0} pixels",
                    MAX_COMPOSITE_SIDE
                ),
            });
        }
        Ok(())
    }
}

/// `count` tiles plus the margins between them, or `None` on overflow.
fn grid_extent(count: u32, tile_size: u32, margin: u32) -> Option<u32> {
    let gaps = count.checked_sub(1)?.checked_mul(margin)?;
    count.checked_mul(tile_size)?.checked_add(gaps)
}

/// Geometry of one composition run.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutSpec {
    /// Edge length of each tile.
    pub tile_size: u32,
    /// Columns in this grid.
    pub tiles_per_row: u32,
    /// Rows in this grid.
    pub row_count: u32,
    /// Gap between columns.
    pub horizontal_margin: u32,
    /// Gap between rows.
    pub vertical_margin: u32,
    /// Tile mask.
    pub corner_style: CornerStyle,
    /// Corner radius for [`CornerStyle::Rounded`].
    pub corner_radius: f32,
    /// Tiles actually placed, after capping to the policy capacity.
    pub item_count: usize,
}

impl LayoutSpec {
    /// Shrink the policy grid to fit `item_count` tiles.
    ///
    /// More items than the policy capacity are capped to the capacity and use
    /// the full configured grid. Zero items still yield a one-cell grid.
    pub fn derive(policy: &LayoutPolicy, item_count: usize) -> Self {
        let capacity = policy.capacity();
        let count = item_count.min(capacity);

        let mut tiles_per_row = policy.tiles_per_row;
        let mut row_count = policy.row_count;

        if count < capacity {
            let per_row = tiles_per_row.max(1) as usize;
            let needed_rows = count.div_ceil(per_row) as u32;
            row_count = row_count.min(needed_rows);
            tiles_per_row = tiles_per_row.min(count as u32);
        }

        Self {
            tile_size: policy.tile_size,
            tiles_per_row: tiles_per_row.max(1),
            row_count: row_count.max(1),
            horizontal_margin: policy.horizontal_margin,
            vertical_margin: policy.vertical_margin,
            corner_style: policy.corner_style,
            corner_radius: policy.corner_radius,
            item_count: count,
        }
    }

    /// Composite width in pixels.
    ///
    /// Assumes the policy passed [`LayoutPolicy::validate`].
    pub fn width(&self) -> u32 {
        self.tiles_per_row * self.tile_size + (self.tiles_per_row - 1) * self.horizontal_margin
    }

    /// Composite height in pixels.
    pub fn height(&self) -> u32 {
        self.row_count * self.tile_size + (self.row_count - 1) * self.vertical_margin
    }

    /// Number of cells in the derived grid.
    pub fn cells(&self) -> usize {
        self.tiles_per_row as usize * self.row_count as usize
    }

    /// Grid position `(row, column)` of tile `index`.
    pub fn cell(&self, index: usize) -> (u32, u32) {
        let per_row = self.tiles_per_row as usize;
        ((index / per_row) as u32, (index % per_row) as u32)
    }

    /// Top-left pixel of tile `index`.
    pub fn tile_origin(&self, index: usize) -> (u32, u32) {
        let (row, col) = self.cell(index);
        (
            col * (self.tile_size + self.horizontal_margin),
            row * (self.tile_size + self.vertical_margin),
        )
    }
}
