//! Table-driven classifier and recording inventory.

use std::collections::HashMap;

use parking_lot::{Mutex, RwLock};

use crate::mediator::{NetworkClassifier, NetworkInventory};
use crate::types::{NetworkHandle, NetworkType};

/// Classifier backed by a lookup table. Unlisted networks are
/// [`NetworkType::Unknown`].
#[derive(Debug, Default)]
pub struct StaticClassifier {
    table: RwLock<HashMap<NetworkHandle, NetworkType>>,
}

impl StaticClassifier {
    /// Empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an entry while building.
    #[must_use]
    pub fn with(self, network: NetworkHandle, network_type: NetworkType) -> Self {
        self.assign(network, network_type);
        self
    }

    /// Adds or replaces an entry.
    pub fn assign(&self, network: NetworkHandle, network_type: NetworkType) {
        self.table.write().insert(network, network_type);
    }
}

impl NetworkClassifier for StaticClassifier {
    fn classify(&self, network: &NetworkHandle) -> NetworkType {
        self.table
            .read()
            .get(network)
            .copied()
            .unwrap_or(NetworkType::Unknown)
    }
}

/// Inventory that records every notification in order.
#[derive(Debug, Default)]
pub struct RecordingInventory {
    notified: Mutex<Vec<NetworkHandle>>,
}

impl RecordingInventory {
    /// Empty record.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Networks notified so far, oldest first.
    #[must_use]
    pub fn notified(&self) -> Vec<NetworkHandle> {
        self.notified.lock().clone()
    }

    /// Number of notifications.
    #[must_use]
    pub fn len(&self) -> usize {
        self.notified.lock().len()
    }

    /// Returns true if nothing was notified.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.notified.lock().is_empty()
    }
}

impl NetworkInventory for RecordingInventory {
    fn notify_available(&self, network: &NetworkHandle) {
        self.notified.lock().push(*network);
    }
}
