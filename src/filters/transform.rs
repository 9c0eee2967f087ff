//! Tile transforms: Resize and shape masks.
//!
//! Both operations are pure and return a new raster.

use crate::compose::layout::LayoutPolicy;
use crate::core::types::{CornerStyle, Raster};
use image::imageops::FilterType;
use image::Rgba;

const TRANSPARENT: Rgba<u8> = Rgba([0, 0, 0, 0]);

/// Resize to exactly `width` x `height` using Lanczos3.
///
/// Aspect ratio is not preserved. A raster that already has the target size is
/// returned unchanged.
pub fn resize(raster: Raster, width: u32, height: u32) -> Raster {
    if raster.dimensions() == (width, height) {
        return raster;
    }
    image::imageops::resize(&raster, width, height, FilterType::Lanczos3)
}

/// Clip `raster` to the shape `style`.
///
/// Pixels whose centre lies inside the shape (boundary included) keep their
/// colour and become fully opaque; every other pixel becomes fully
/// transparent. `radius` only applies to [`CornerStyle::Rounded`] and is
/// clamped to half the shorter side.
pub fn apply_mask(raster: Raster, style: CornerStyle, radius: f32) -> Raster {
    let (width, height) = raster.dimensions();
    let mask = ShapeMask::new(style, width, height, radius);

    let mut output = raster;
    for (x, y, pixel) in output.enumerate_pixels_mut() {
        if mask.contains(x, y) {
            pixel[3] = u8::MAX;
        } else {
            *pixel = TRANSPARENT;
        }
    }
    output
}

/// Resize to the policy tile size, then mask with the policy style.
pub fn prepare_tile(raster: Raster, policy: &LayoutPolicy) -> Raster {
    let resized = resize(raster, policy.tile_size, policy.tile_size);
    apply_mask(resized, policy.corner_style, policy.corner_radius)
}

/// Membership test for a mask shape, in pixel-centre coordinates.
#[derive(Debug, Clone, Copy)]
struct ShapeMask {
    style: CornerStyle,
    width: f64,
    height: f64,
    radius: f64,
}

impl ShapeMask {
    fn new(style: CornerStyle, width: u32, height: u32, radius: f32) -> Self {
        let width = f64::from(width);
        let height = f64::from(height);
        let half_short = width.min(height) / 2.0;
        let radius = match style {
            CornerStyle::Circular => half_short,
            // max() discards NaN
            CornerStyle::Rounded => f64::from(radius).max(0.0).min(half_short),
        };
        Self {
            style,
            width,
            height,
            radius,
        }
    }

    fn contains(&self, x: u32, y: u32) -> bool {
        let px = f64::from(x) + 0.5;
        let py = f64::from(y) + 0.5;

        match self.style {
            CornerStyle::Circular => {
                let dx = px - self.width / 2.0;
                let dy = py - self.height / 2.0;
                dx * dx + dy * dy <= self.radius * self.radius
            }
            CornerStyle::Rounded => {
                let r = self.radius;
                // Nearest point of the inner rectangle whose corners carry the arcs.
                let cx = px.clamp(r, self.width - r);
                let cy = py.clamp(r, self.height - r);
                let dx = px - cx;
                let dy = py - cy;
                dx * dx + dy * dy <= r * r
            }
        }
    }
}
