//! Point-in-time view of a mediator.

use serde::{Deserialize, Serialize};

use super::grants::GrantCounters;
use crate::types::{NetworkType, RequestSpec};

/// Consistent copy of the mediator's accounting, taken under one lock
/// acquisition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediatorSnapshot {
    /// Configured mediator name.
    pub name: String,
    /// Leases whose spec is part of the demand.
    pub open_leases: usize,
    /// Merged demand, as last published.
    pub demand: Option<RequestSpec>,
    /// Bound leases per classification.
    pub grants: GrantCounters,
    /// Sum of `grants`.
    pub bound_leases: usize,
    /// Dominant classification, as last published.
    pub dominant: Option<NetworkType>,
}

impl MediatorSnapshot {
    /// Returns true if no lease is open.
    #[must_use]
    pub const fn is_idle(&self) -> bool {
        self.open_leases == 0
    }

    /// Number of open leases still waiting for a network.
    #[must_use]
    pub fn unbound_leases(&self) -> usize {
        self.open_leases.saturating_sub(self.bound_leases)
    }
}
