//! Published composites.
//!
//! An [`ImageSlot`] holds the composite currently served for one collection,
//! together with its PNG encoding. The refresh loop is the only writer and
//! swaps in a whole new entry at once; readers load the current pointer
//! without taking a lock.

use crate::compose::grid::Composite;
use arc_swap::ArcSwapOption;
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// One publication: the composite and the PNG served for it.
#[derive(Debug)]
struct Published {
    composite: Arc<Composite>,
    png: Bytes,
}

/// Current composite of one collection.
#[derive(Debug)]
pub struct ImageSlot {
    name: String,
    current: ArcSwapOption<Published>,
    generation: AtomicU64,
}

impl ImageSlot {
    /// Create an empty slot.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            current: ArcSwapOption::empty(),
            generation: AtomicU64::new(0),
        }
    }

    /// Collection name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Encode `composite` and make it the served value.
    ///
    /// On an encoding failure the slot keeps its previous value.
    pub fn publish(&self, composite: Composite) -> Result<Arc<Composite>, image::ImageError> {
        let png = Bytes::from(composite.encode_png()?);
        let composite = Arc::new(composite);
        self.current.store(Some(Arc::new(Published {
            composite: Arc::clone(&composite),
            png,
        })));
        self.generation.fetch_add(1, Ordering::AcqRel);
        Ok(composite)
    }

    /// The composite being served, if one was ever published.
    pub fn snapshot(&self) -> Option<Arc<Composite>> {
        self.current
            .load_full()
            .map(|published| Arc::clone(&published.composite))
    }

    /// PNG encoding of the composite being served.
    pub fn png(&self) -> Option<Bytes> {
        self.current.load_full().map(|published| published.png.clone())
    }

    /// Number of successful publications so far.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }
}

/// All slots of the process, fixed at startup.
#[derive(Debug, Default)]
pub struct SlotRegistry {
    slots: HashMap<String, Arc<ImageSlot>>,
    order: Vec<String>,
}

impl SlotRegistry {
    /// Create one empty slot per name. Duplicate names share a slot.
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut registry = Self::default();
        for name in names {
            let name = name.into();
            if registry.slots.contains_key(&name) {
                continue;
            }
            registry
                .slots
                .insert(name.clone(), Arc::new(ImageSlot::new(name.clone())));
            registry.order.push(name);
        }
        registry
    }

    /// Slot for `name`.
    pub fn get(&self, name: &str) -> Option<Arc<ImageSlot>> {
        self.slots.get(name).cloned()
    }

    /// Collection names in configuration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    /// Number of slots.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Check if no collection is tracked.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
