//! # Stargrid - Avatar collages for README badges
//!
//! Stargrid builds a composite image out of the avatars of a GitHub
//! repository's stargazers or contributors and serves it over HTTP,
//! rebuilding it on a timer.
//!
//! ## Pipeline
//!
//! - **Listing**: a [`ListingProvider`] returns the ordered avatar URLs of a
//!   collection
//! - **Fan-out**: the [`FanOutCollector`] fetches, decodes, resizes and masks
//!   every avatar with bounded concurrency, failing fast on the first error
//! - **Composition**: [`compose`] lays the tiles out on a grid that shrinks to
//!   fit short listings
//! - **Publication**: the [`Refresher`] swaps finished composites into
//!   [`ImageSlot`]s that the HTTP layer reads
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use stargrid::prelude::*;
//! use std::sync::Arc;
//!
//! let config = Config::from_env()?;
//! let fetcher = Arc::new(HttpFetcher::from_config(&config));
//! let listing = Arc::new(GithubListing::from_config(&config));
//! let collector = FanOutCollector::from_config(fetcher, &config);
//!
//! let refresher = Refresher::new(&config, listing, collector);
//! let report = refresher.run_cycle();
//! for outcome in &report.outcomes {
//!     println!("{}: {:?}", outcome.name, outcome.result);
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod compose;
pub mod core;
pub mod execution;
pub mod filters;
pub mod refresh;
pub mod server;
pub mod source;

#[cfg(test)]
pub(crate) mod testing;

/// Prelude module for convenient imports.
///
/// Import everything commonly needed with:
/// ```rust,ignore
/// use stargrid::prelude::*;
/// ```
pub mod prelude {
    // Core types
    pub use crate::core::types::{CornerStyle, ImageSource, Raster, RawImage};

    // Configuration
    pub use crate::core::config::{CollectionConfig, Config, Credential, ServerConfig};

    // Errors
    pub use crate::core::error::{
        CollectError, ConfigError, DecodeError, FetchError, ItemError, ListingError, ServeError,
        StargridError, StargridResult,
    };

    // Sources
    pub use crate::source::{decode, GithubListing, HttpFetcher, ListingProvider, SourceFetcher, StaticListing};

    // Transforms
    pub use crate::filters::transform::{apply_mask, prepare_tile, resize};

    // Execution
    pub use crate::execution::collector::{CollectStats, FanOutCollector};

    // Composition
    pub use crate::compose::{compose, Composite, LayoutPolicy, LayoutSpec};

    // Refresh
    pub use crate::refresh::{CycleReport, ImageSlot, RefreshState, Refresher, SlotRegistry};
}

pub use crate::compose::compose;
pub use crate::execution::FanOutCollector;
pub use crate::refresh::{ImageSlot, Refresher};
pub use crate::source::ListingProvider;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name.
pub const NAME: &str = env!("CARGO_PKG_NAME");

#[cfg(test)]
mod tests {
    use super::prelude::*;
    use crate::testing::MemoryFetcher;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn test_version() {
        assert!(!super::VERSION.is_empty());
        assert_eq!(super::NAME, "stargrid");
    }

    #[test]
    fn test_five_avatars_end_to_end() {
        let colours = [
            [200, 0, 0, 255],
            [0, 200, 0, 255],
            [0, 0, 200, 255],
            [200, 200, 0, 255],
            [0, 200, 200, 255],
        ];
        // Later avatars answer first.
        let fetcher = colours.iter().enumerate().fold(MemoryFetcher::new(), |f, (i, c)| {
            f.image(&format!("avatar-{}", i), 96, *c, Duration::from_millis(10 * (5 - i as u64)))
        });

        let policy = LayoutPolicy {
            tile_size: 64,
            tiles_per_row: 3,
            row_count: 2,
            horizontal_margin: 12,
            vertical_margin: 12,
            corner_style: CornerStyle::Rounded,
            corner_radius: 8.0,
        };
        let sources: Vec<_> = (0..5).map(|i| ImageSource::new(format!("avatar-{}", i))).collect();

        let collector = FanOutCollector::new(Arc::new(fetcher)).with_concurrency(4);
        let tiles = collector.collect(&sources, &policy).unwrap();
        let composite = compose(&tiles, &policy);

        assert_eq!((composite.width(), composite.height()), (216, 140));
        assert_eq!(composite.layout().tiles_per_row, 3);
        assert_eq!(composite.layout().row_count, 2);

        let placements = [(0, 0), (0, 1), (0, 2), (1, 0), (1, 1)];
        for (i, (row, col)) in placements.iter().enumerate() {
            assert_eq!(composite.layout().cell(i), (*row, *col));
            let x = col * 76 + 32;
            let y = row * 76 + 32;
            assert_eq!(composite.image().get_pixel(x, y).0, colours[i]);
            // Rounded corners are cut out.
            assert_eq!(composite.image().get_pixel(col * 76, row * 76)[3], 0);
        }
        // The sixth cell is empty.
        assert_eq!(composite.image().get_pixel(2 * 76 + 32, 76 + 32)[3], 0);
    }

    #[test]
    fn test_failed_fetch_produces_no_composite() {
        let fetcher = MemoryFetcher::new()
            .image("a", 16, [1, 1, 1, 255], Duration::ZERO)
            .failure(
                "b",
                FetchError::HttpStatus {
                    url: "b".to_string(),
                    code: 502,
                },
                Duration::ZERO,
            );
        let collector = FanOutCollector::new(Arc::new(fetcher));
        let sources = vec![ImageSource::new("a"), ImageSource::new("b")];

        let result = collector.collect(&sources, &LayoutPolicy::default());
        assert!(matches!(result, Err(CollectError::Item { index: 1, .. })));
    }
}
