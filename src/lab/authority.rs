//! In-memory provisioning authority.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::mediator::{NetworkCallback, ProvisioningAuthority, RegistrationError, RegistrationId};
use crate::types::{NetworkHandle, RequestSpec};

/// Counters kept by a [`LabAuthority`].
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LabAuthorityMetrics {
    /// Accepted registrations.
    pub registrations: u64,
    /// Deregistrations of a live registration.
    pub deregistrations: u64,
    /// Refused registrations.
    pub rejections: u64,
    /// `on_available` deliveries.
    pub availability_events: u64,
    /// `on_unavailable` deliveries.
    pub loss_events: u64,
}

struct LabRegistration {
    spec: RequestSpec,
    callback: Arc<dyn NetworkCallback>,
}

#[derive(Default)]
struct LabState {
    registrations: BTreeMap<RegistrationId, LabRegistration>,
    reject_next: Option<String>,
    metrics: LabAuthorityMetrics,
}

/// Provisioning authority driven by the test.
///
/// Registrations are kept in memory; the test decides when a network comes
/// and goes. Callbacks are delivered on the calling thread, outside the
/// authority's lock.
pub struct LabAuthority {
    limit: Option<usize>,
    next_id: AtomicU64,
    state: Mutex<LabState>,
}

impl std::fmt::Debug for LabAuthority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("LabAuthority")
            .field("limit", &self.limit)
            .field("active", &state.registrations.len())
            .field("metrics", &state.metrics)
            .finish()
    }
}

impl Default for LabAuthority {
    fn default() -> Self {
        Self::new()
    }
}

impl LabAuthority {
    /// Authority with no registration limit.
    #[must_use]
    pub fn new() -> Self {
        Self {
            limit: None,
            next_id: AtomicU64::new(1),
            state: Mutex::new(LabState::default()),
        }
    }

    /// Authority refusing registrations beyond `limit` live ones.
    #[must_use]
    pub fn with_limit(limit: usize) -> Self {
        Self {
            limit: Some(limit),
            ..Self::new()
        }
    }

    /// Makes the next registration fail with
    /// [`RegistrationError::Rejected`].
    pub fn reject_next(&self, reason: impl Into<String>) {
        self.state.lock().reject_next = Some(reason.into());
    }

    /// Number of live registrations.
    #[must_use]
    pub fn active(&self) -> usize {
        self.state.lock().registrations.len()
    }

    /// Returns true if `id` is registered.
    #[must_use]
    pub fn is_registered(&self, id: RegistrationId) -> bool {
        self.state.lock().registrations.contains_key(&id)
    }

    /// Live registrations in id order.
    #[must_use]
    pub fn registrations(&self) -> Vec<(RegistrationId, RequestSpec)> {
        self.state
            .lock()
            .registrations
            .iter()
            .map(|(id, reg)| (*id, reg.spec))
            .collect()
    }

    /// The callback of a live registration.
    ///
    /// Holding it past deregistration lets a test deliver a late callback.
    #[must_use]
    pub fn callback(&self, id: RegistrationId) -> Option<Arc<dyn NetworkCallback>> {
        self.state
            .lock()
            .registrations
            .get(&id)
            .map(|reg| Arc::clone(&reg.callback))
    }

    /// Reports `network` available to registration `id`.
    ///
    /// Returns false if `id` is not registered.
    pub fn make_available(&self, id: RegistrationId, network: NetworkHandle) -> bool {
        let Some(callback) = self.deliver(id, |m| m.availability_events += 1) else {
            return false;
        };
        callback.on_available(network);
        true
    }

    /// Reports the network of registration `id` lost.
    ///
    /// Returns false if `id` is not registered.
    pub fn make_unavailable(&self, id: RegistrationId) -> bool {
        let Some(callback) = self.deliver(id, |m| m.loss_events += 1) else {
            return false;
        };
        callback.on_unavailable();
        true
    }

    /// Reports `network` available to every registration whose spec allows
    /// it, according to `accepts`. Returns the number of deliveries.
    pub fn make_available_where<F>(&self, network: NetworkHandle, accepts: F) -> usize
    where
        F: Fn(&RequestSpec) -> bool,
    {
        let targets: Vec<_> = {
            let mut state = self.state.lock();
            let targets: Vec<_> = state
                .registrations
                .values()
                .filter(|reg| accepts(&reg.spec))
                .map(|reg| Arc::clone(&reg.callback))
                .collect();
            state.metrics.availability_events += targets.len() as u64;
            targets
        };
        for callback in &targets {
            callback.on_available(network);
        }
        targets.len()
    }

    /// Counters so far.
    #[must_use]
    pub fn metrics(&self) -> LabAuthorityMetrics {
        self.state.lock().metrics.clone()
    }

    fn deliver(
        &self,
        id: RegistrationId,
        count: impl FnOnce(&mut LabAuthorityMetrics),
    ) -> Option<Arc<dyn NetworkCallback>> {
        let mut state = self.state.lock();
        let callback = Arc::clone(&state.registrations.get(&id)?.callback);
        count(&mut state.metrics);
        Some(callback)
    }
}

impl ProvisioningAuthority for LabAuthority {
    fn register(
        &self,
        spec: &RequestSpec,
        callback: Arc<dyn NetworkCallback>,
    ) -> Result<RegistrationId, RegistrationError> {
        let mut state = self.state.lock();
        if let Some(reason) = state.reject_next.take() {
            state.metrics.rejections += 1;
            return Err(RegistrationError::Rejected(reason));
        }
        if let Some(limit) = self.limit {
            if state.registrations.len() >= limit {
                state.metrics.rejections += 1;
                return Err(RegistrationError::LimitExceeded { limit });
            }
        }
        let id = RegistrationId::new(self.next_id.fetch_add(1, Ordering::Relaxed));
        state.registrations.insert(
            id,
            LabRegistration {
                spec: *spec,
                callback,
            },
        );
        state.metrics.registrations += 1;
        tracing::trace!(registration = %id, %spec, "lab registration");
        Ok(id)
    }

    fn deregister(&self, id: RegistrationId) {
        let removed = {
            let mut state = self.state.lock();
            let removed = state.registrations.remove(&id);
            if removed.is_some() {
                state.metrics.deregistrations += 1;
            }
            removed
        };
        if removed.is_none() {
            tracing::warn!(registration = %id, "deregistering unknown registration");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::NetworkType;
    use std::sync::atomic::AtomicUsize;

    #[derive(Default)]
    struct Counting {
        available: AtomicUsize,
        lost: AtomicUsize,
    }

    impl NetworkCallback for Counting {
        fn on_available(&self, _network: NetworkHandle) {
            self.available.fetch_add(1, Ordering::SeqCst);
        }

        fn on_unavailable(&self) {
            self.lost.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn delivers_to_live_registrations_only() {
        let authority = LabAuthority::new();
        let callback = Arc::new(Counting::default());
        let id = authority
            .register(&RequestSpec::high_bandwidth(), callback.clone())
            .expect("register");

        assert!(authority.make_available(id, NetworkHandle::new(1)));
        assert!(authority.make_unavailable(id));
        authority.deregister(id);
        assert!(!authority.make_available(id, NetworkHandle::new(1)));

        assert_eq!(callback.available.load(Ordering::SeqCst), 1);
        assert_eq!(callback.lost.load(Ordering::SeqCst), 1);
        let metrics = authority.metrics();
        assert_eq!(metrics.registrations, 1);
        assert_eq!(metrics.deregistrations, 1);
        assert_eq!(metrics.availability_events, 1);
        assert_eq!(metrics.loss_events, 1);
    }

    #[test]
    fn limit_and_rejection() {
        let authority = LabAuthority::with_limit(1);
        let callback = Arc::new(Counting::default());
        let spec = RequestSpec::for_transport(NetworkType::Wifi);

        authority.reject_next("airplane mode");
        assert_eq!(
            authority.register(&spec, callback.clone()),
            Err(RegistrationError::Rejected("airplane mode".into()))
        );
        let id = authority.register(&spec, callback.clone()).expect("first");
        assert_eq!(
            authority.register(&spec, callback.clone()),
            Err(RegistrationError::LimitExceeded { limit: 1 })
        );
        authority.deregister(id);
        assert!(authority.register(&spec, callback).is_ok());
        assert_eq!(authority.metrics().rejections, 2);
    }

    #[test]
    fn broadcast_filters_by_spec() {
        let authority = LabAuthority::new();
        let wifi = Arc::new(Counting::default());
        let cell = Arc::new(Counting::default());
        authority
            .register(&RequestSpec::for_transport(NetworkType::Wifi), wifi.clone())
            .expect("wifi");
        authority
            .register(&RequestSpec::for_transport(NetworkType::Cellular), cell.clone())
            .expect("cell");

        let delivered = authority.make_available_where(NetworkHandle::new(9), |spec| {
            spec.transports().contains(NetworkType::Wifi)
        });
        assert_eq!(delivered, 1);
        assert_eq!(wifi.available.load(Ordering::SeqCst), 1);
        assert_eq!(cell.available.load(Ordering::SeqCst), 0);
        assert_eq!(authority.registrations().len(), 2);
    }
}
