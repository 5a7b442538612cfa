//! Single-slot in-memory document store.
//!
//! Holds the currently loaded [`Dataset`] behind one `RwLock`. A load swaps
//! in a fresh `Arc`, so a reader that grabbed the previous snapshot keeps a
//! consistent view while the swap happens.

use std::sync::{Arc, RwLock};

use crate::error::{Result, TrackerError};
use crate::models::Dataset;

#[derive(Default)]
pub struct DocumentStore {
    slot: RwLock<Option<Arc<Dataset>>>,
}

impl DocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current dataset, or `None` before the first load and after a reset.
    pub fn get(&self) -> Option<Arc<Dataset>> {
        self.slot
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Current dataset, or [`TrackerError::DatasetUnavailable`].
    pub fn current(&self) -> Result<Arc<Dataset>> {
        self.get().ok_or(TrackerError::DatasetUnavailable)
    }

    /// Replaces the slot wholesale.
    pub fn set(&self, dataset: Dataset) {
        let dataset = Arc::new(dataset);
        *self
            .slot
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(dataset);
    }

    pub fn clear(&self) {
        *self
            .slot
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = None;
    }
}
