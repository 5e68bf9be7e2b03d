//! Shared mediator state and its lock discipline.
//!
//! [`MediatorState`] bundles the aggregated demand, the grant counters and
//! the senders of both published signals. It lives behind one mutex in
//! [`MediatorCore`] and its fields are private to this module: every
//! mutation goes through a method that republishes the affected signal
//! before the lock is released, so a reader can never observe a signal that
//! disagrees with the counters behind it.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use super::authority::{NetworkClassifier, NetworkInventory, ProvisioningAuthority};
use super::demand::AggregatedDemand;
use super::grants::GrantCounters;
use super::lease::LeaseId;
use super::snapshot::MediatorSnapshot;
use crate::channel::watch;
use crate::config::MediatorConfig;
use crate::error::{Error, Result};
use crate::types::{NetworkHandle, NetworkType, RequestSpec};

/// Mutable state guarded by [`MediatorCore::with_state`].
#[derive(Debug)]
pub(crate) struct MediatorState {
    demand: AggregatedDemand,
    grants: GrantCounters,
    demand_tx: watch::Sender<Option<RequestSpec>>,
    dominant_tx: watch::Sender<Option<NetworkType>>,
}

impl MediatorState {
    fn new() -> Self {
        let (demand_tx, _) = watch::channel(None);
        let (dominant_tx, _) = watch::channel(None);
        Self {
            demand: AggregatedDemand::new(),
            grants: GrantCounters::new(),
            demand_tx,
            dominant_tx,
        }
    }

    fn publish_demand(&self) {
        let merged = self.demand.merge();
        tracing::trace!(open = self.demand.len(), demand = ?merged, "publishing demand");
        self.demand_tx.send_replace(merged);
    }

    fn publish_dominant(&self) {
        let dominant = self.grants.resolve();
        tracing::trace!(bound = self.grants.total(), dominant = ?dominant, "publishing dominant");
        self.dominant_tx.send_replace(dominant);
    }

    /// Adds `spec` to the demand and republishes.
    pub(crate) fn admit(&mut self, spec: RequestSpec) {
        self.demand.add(spec);
        self.publish_demand();
    }

    /// Removes one instance of `spec` from the demand and republishes.
    pub(crate) fn withdraw(&mut self, spec: &RequestSpec) {
        if !self.demand.remove(spec) {
            tracing::debug!(spec = %spec, "withdrawing spec that was never admitted");
        }
        self.publish_demand();
    }

    /// Moves one lease from `previous` (if bound) to `next` and republishes.
    ///
    /// Rebinding to the same classification still runs both halves and
    /// republishes.
    pub(crate) fn rebind(&mut self, lease: LeaseId, previous: Option<NetworkType>, next: NetworkType) {
        if let Some(previous) = previous {
            self.decrement(lease, previous);
        }
        self.grants.increment(next);
        self.publish_dominant();
    }

    /// Drops one lease bound to `network_type` and republishes.
    pub(crate) fn unbind(&mut self, lease: LeaseId, network_type: NetworkType) {
        self.decrement(lease, network_type);
        self.publish_dominant();
    }

    fn decrement(&mut self, lease: LeaseId, network_type: NetworkType) {
        if let Err(err) = self.grants.decrement(network_type) {
            tracing::error!(
                lease_id = %lease,
                network_type = %network_type,
                error = %err,
                "grant counter underflow"
            );
        }
    }
}

/// State shared between a [`LeaseMediator`](super::LeaseMediator) and its
/// leases.
///
/// Leases hold only a `Weak` reference to it.
pub(crate) struct MediatorCore {
    config: MediatorConfig,
    authority: Arc<dyn ProvisioningAuthority>,
    classifier: Arc<dyn NetworkClassifier>,
    inventory: Arc<dyn NetworkInventory>,
    state: Mutex<MediatorState>,
    next_lease_id: AtomicU64,
}

impl std::fmt::Debug for MediatorCore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediatorCore")
            .field("config", &self.config)
            .field("state", &*self.state.lock())
            .finish_non_exhaustive()
    }
}

impl MediatorCore {
    pub(crate) fn new(
        config: MediatorConfig,
        authority: Arc<dyn ProvisioningAuthority>,
        classifier: Arc<dyn NetworkClassifier>,
        inventory: Arc<dyn NetworkInventory>,
    ) -> Self {
        Self {
            config,
            authority,
            classifier,
            inventory,
            state: Mutex::new(MediatorState::new()),
            next_lease_id: AtomicU64::new(1),
        }
    }

    pub(crate) fn name(&self) -> &str {
        &self.config.name
    }

    pub(crate) fn authority(&self) -> &Arc<dyn ProvisioningAuthority> {
        &self.authority
    }

    pub(crate) fn next_lease_id(&self) -> LeaseId {
        LeaseId::new(self.next_lease_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Runs `f` inside the mediator's single critical section.
    pub(crate) fn with_state<R>(&self, f: impl FnOnce(&mut MediatorState) -> R) -> R {
        let mut state = self.state.lock();
        f(&mut state)
    }

    /// Checks the configured cap and admits `spec` in one critical section.
    ///
    /// The spec is in the demand before the authority hears of the request,
    /// so a callback fired during registration always finds it there.
    pub(crate) fn admit_within_cap(&self, spec: RequestSpec) -> Result<()> {
        let mut state = self.state.lock();
        if let Some(limit) = self.config.lease_limit() {
            if state.demand.len() >= limit {
                return Err(Error::resource_exhausted(limit));
            }
        }
        state.admit(spec);
        Ok(())
    }

    pub(crate) fn classify(&self, network: &NetworkHandle) -> NetworkType {
        self.classifier.classify(network)
    }

    pub(crate) fn notify_available(&self, network: &NetworkHandle) {
        self.inventory.notify_available(network);
    }

    pub(crate) fn subscribe_demand(&self) -> watch::Receiver<Option<RequestSpec>> {
        self.state.lock().demand_tx.subscribe()
    }

    pub(crate) fn subscribe_dominant(&self) -> watch::Receiver<Option<NetworkType>> {
        self.state.lock().dominant_tx.subscribe()
    }

    pub(crate) fn snapshot(&self) -> MediatorSnapshot {
        let state = self.state.lock();
        MediatorSnapshot {
            name: self.config.name.clone(),
            open_leases: state.demand.len(),
            demand: state.demand.merge(),
            grants: state.grants,
            bound_leases: state.grants.total(),
            dominant: state.grants.resolve(),
        }
    }
}
