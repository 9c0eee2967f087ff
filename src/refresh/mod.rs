//! Periodic refresh and publication of composites.

pub mod refresher;
pub mod slot;

pub use refresher::{CollectionOutcome, CycleReport, RefreshState, Refresher};
pub use slot::{ImageSlot, SlotRegistry};
