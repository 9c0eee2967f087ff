//! Periodic rebuild of every tracked collection.
//!
//! Each cycle moves `Idle → Running → Success | Failed → Idle`. Collections are
//! rebuilt independently; a failed collection keeps serving its previous
//! composite. The first failed cycle of an outage is retried after the
//! shorter retry interval; later failures wait the normal refresh interval
//! until a cycle succeeds again.

use crate::compose::grid::compose;
use crate::compose::layout::LayoutPolicy;
use crate::core::config::Config;
use crate::core::error::{ServeError, StargridResult};
use crate::execution::collector::FanOutCollector;
use crate::refresh::slot::SlotRegistry;
use crate::source::listing::ListingProvider;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Where the refresh loop currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshState {
    /// Waiting for the next timer tick.
    Idle,
    /// A cycle is rebuilding composites.
    Running,
    /// The last cycle published every collection.
    Success,
    /// The last cycle failed for at least one collection.
    Failed,
}

/// Result of rebuilding one collection.
#[derive(Debug)]
pub struct CollectionOutcome {
    /// Collection name.
    pub name: String,
    /// Number of tiles published, or why nothing was published.
    pub result: StargridResult<usize>,
}

/// Result of one refresh cycle.
#[derive(Debug)]
pub struct CycleReport {
    /// One outcome per collection, in configuration order.
    pub outcomes: Vec<CollectionOutcome>,
    /// Wall time of the cycle.
    pub duration: Duration,
}

impl CycleReport {
    /// Check if every collection was published.
    pub fn is_success(&self) -> bool {
        self.outcomes.iter().all(|o| o.result.is_ok())
    }

    /// Collections that failed.
    pub fn failures(&self) -> impl Iterator<Item = &CollectionOutcome> {
        self.outcomes.iter().filter(|o| o.result.is_err())
    }

    /// Tiles published for `name`, if it succeeded.
    pub fn published(&self, name: &str) -> Option<usize> {
        self.outcomes
            .iter()
            .find(|o| o.name == name)
            .and_then(|o| o.result.as_ref().ok().copied())
    }
}

struct TrackedCollection {
    name: String,
    policy: LayoutPolicy,
}

/// Rebuilds and publishes the composites of all configured collections.
pub struct Refresher {
    collections: Vec<TrackedCollection>,
    listing: Arc<dyn ListingProvider>,
    collector: FanOutCollector,
    slots: Arc<SlotRegistry>,
    refresh_interval: Duration,
    retry_interval: Duration,
    state: Mutex<RefreshState>,
    retry_spent: AtomicBool,
}

impl Refresher {
    /// Create a refresher and the slots it publishes into.
    pub fn new(
        config: &Config,
        listing: Arc<dyn ListingProvider>,
        collector: FanOutCollector,
    ) -> Self {
        let collections: Vec<_> = config
            .collections
            .iter()
            .map(|c| TrackedCollection {
                name: c.name.clone(),
                policy: config.layout_for(c),
            })
            .collect();
        let slots = Arc::new(SlotRegistry::new(collections.iter().map(|c| c.name.clone())));

        Self {
            collections,
            listing,
            collector,
            slots,
            refresh_interval: config.refresh_interval(),
            retry_interval: config.retry_interval(),
            state: Mutex::new(RefreshState::Idle),
            retry_spent: AtomicBool::new(false),
        }
    }

    /// Slots written by this refresher.
    pub fn slots(&self) -> Arc<SlotRegistry> {
        Arc::clone(&self.slots)
    }

    /// Current state.
    pub fn state(&self) -> RefreshState {
        *self.state.lock()
    }

    /// Rebuild every collection once.
    pub fn run_cycle(&self) -> CycleReport {
        let start_time = Instant::now();
        self.set_state(RefreshState::Running);

        let outcomes: Vec<_> = self
            .collections
            .iter()
            .map(|collection| {
                let result = self.refresh_collection(collection);
                match &result {
                    Ok(count) => {
                        log::info!("published '{}' with {} avatar(s)", collection.name, count)
                    }
                    Err(error) => log::error!(
                        "failed to refresh '{}', keeping previous image: {}",
                        collection.name,
                        error
                    ),
                }
                CollectionOutcome {
                    name: collection.name.clone(),
                    result,
                }
            })
            .collect();

        let report = CycleReport {
            outcomes,
            duration: start_time.elapsed(),
        };

        self.set_state(if report.is_success() {
            RefreshState::Success
        } else {
            RefreshState::Failed
        });
        log::debug!("refresh cycle finished in {}ms", report.duration.as_millis());
        report
    }

    /// Delay before the cycle following `report`.
    ///
    /// Only the first failed cycle after a success gets the retry interval.
    pub fn next_delay(&self, report: &CycleReport) -> Duration {
        if report.is_success() {
            self.retry_spent.store(false, Ordering::Release);
            self.refresh_interval
        } else if self.retry_spent.swap(true, Ordering::AcqRel) {
            self.refresh_interval
        } else {
            self.retry_interval
        }
    }

    /// Run one cycle and return to `Idle`, yielding the delay to wait next.
    pub fn tick(&self) -> Duration {
        let report = self.run_cycle();
        let delay = self.next_delay(&report);
        self.set_state(RefreshState::Idle);
        delay
    }

    /// Refresh forever on a dedicated thread, starting after `initial_delay`.
    ///
    /// The loop lives as long as the process; there is no shutdown signal.
    pub fn spawn(self: Arc<Self>, initial_delay: Duration) -> std::io::Result<JoinHandle<()>> {
        thread::Builder::new()
            .name("stargrid-refresh".to_string())
            .spawn(move || {
                let mut delay = initial_delay;
                loop {
                    log::debug!("next refresh in {}s", delay.as_secs());
                    thread::sleep(delay);
                    delay = self.tick();
                }
            })
    }

    fn refresh_collection(&self, collection: &TrackedCollection) -> StargridResult<usize> {
        let slot = self
            .slots
            .get(&collection.name)
            .ok_or_else(|| ServeError::UnknownCollection(collection.name.clone()))?;

        let sources = self
            .listing
            .list(&collection.name, collection.policy.capacity())?;
        let tiles = self.collector.collect(&sources, &collection.policy)?;
        let composite = compose(&tiles, &collection.policy);
        let count = composite.tile_count();

        slot.publish(composite)?;
        Ok(count)
    }

    fn set_state(&self, state: RefreshState) {
        *self.state.lock() = state;
    }
}
