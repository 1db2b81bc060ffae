//! Delivery tracking — bundles that already have a forwarding decision in flight.
//!
//! A bundle id is either free (absent) or committed (present). Commit happens
//! when a decision is emitted; retraction on `SendingFailed` or `Timeout`.

use std::collections::HashSet;

#[derive(Debug, Default)]
pub struct DeliveryTracker {
    committed: HashSet<String>,
}

impl DeliveryTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_committed(&self, bundle_id: &str) -> bool {
        self.committed.contains(bundle_id)
    }

    /// Mark a bundle as committed. Returns false if it already was.
    pub fn commit(&mut self, bundle_id: &str) -> bool {
        if self.committed.contains(bundle_id) {
            return false;
        }
        self.committed.insert(bundle_id.to_string())
    }

    /// Free a bundle for a new decision. Returns false if it was not committed.
    pub fn retract(&mut self, bundle_id: &str) -> bool {
        self.committed.remove(bundle_id)
    }

    /// Number of committed bundles.
    pub fn len(&self) -> usize {
        self.committed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.committed.is_empty()
    }
}
