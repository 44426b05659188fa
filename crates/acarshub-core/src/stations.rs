//! In-memory station-id registry. Seeded at
//! startup from the messages table; mutated only by the persister, read by
//! fan-out.

use std::collections::BTreeSet;
use std::sync::{Arc, RwLock};

#[derive(Clone, Default)]
pub struct StationRegistry {
    inner: Arc<RwLock<BTreeSet<String>>>,
}

impl StationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(seen: impl IntoIterator<Item = String>) -> Self {
        let reg = Self::new();
        reg.inner.write().unwrap().extend(seen);
        reg
    }

    /// Record a station id; returns `true` if it was not already known,
    /// signalling the caller to trigger a station-id broadcast.
    pub fn observe(&self, station_id: &str) -> bool {
        if station_id.is_empty() {
            return false;
        }
        self.inner.write().unwrap().insert(station_id.to_owned())
    }

    /// Sorted snapshot of every distinct station id observed so far.
    pub fn snapshot(&self) -> Vec<String> {
        self.inner.read().unwrap().iter().cloned().collect()
    }
}
