//! Image sources: listing, fetching and decoding.

pub mod decode;
pub mod fetcher;
pub mod listing;

pub use decode::decode;
pub use fetcher::{HttpFetcher, SourceFetcher, MAX_IMAGE_BYTES};
pub use listing::{GithubListing, ListingProvider, StaticListing};
