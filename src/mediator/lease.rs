//! Per-request lease handles.
//!
//! A [`Lease`] is created by
//! [`LeaseMediator::request_lease`](super::LeaseMediator::request_lease) and
//! moves through three states:
//!
//! ```text
//! Unbound ──on_available──▶ Bound ──on_unavailable──▶ Unbound
//!    │                        │
//!    └──────── close ─────────┴──────────▶ Closed (terminal)
//! ```
//!
//! State transitions and the grant counter updates that go with them happen
//! inside the mediator's critical section, so a lease is never observed as
//! bound without the matching grant.
//!
//! # Cancel safety
//!
//! [`Lease::await_granted`] only reads the lease state. Dropping the future
//! before it completes leaves the lease and the mediator untouched.
//! Dropping the [`Lease`] itself closes it.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock, Weak};

use super::authority::{NetworkCallback, ProvisioningAuthority, RegistrationId};
use super::state::MediatorCore;
use crate::channel::watch;
use crate::error::{Error, Result};
use crate::stream::WatchStream;
use crate::types::{NetworkHandle, NetworkType, RequestSpec};

/// Mediator-assigned lease id, unique per mediator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LeaseId(u64);

impl LeaseId {
    pub(crate) const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw id.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for LeaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "lease-{}", self.0)
    }
}

/// Observable state of a lease.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaseState {
    /// Waiting for the authority to provide a network.
    Unbound,
    /// A network is available and counted in the grants.
    Bound {
        /// The network the authority provided.
        network: NetworkHandle,
        /// Its classification.
        network_type: NetworkType,
    },
    /// Closed. No further transitions.
    Closed,
}

impl LeaseState {
    /// Classification of the bound network, if any.
    #[must_use]
    pub const fn network_type(&self) -> Option<NetworkType> {
        match self {
            Self::Bound { network_type, .. } => Some(*network_type),
            Self::Unbound | Self::Closed => None,
        }
    }

    /// The bound network, if any.
    #[must_use]
    pub const fn network(&self) -> Option<NetworkHandle> {
        match self {
            Self::Bound { network, .. } => Some(*network),
            Self::Unbound | Self::Closed => None,
        }
    }

    /// Returns true if the lease is closed.
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        matches!(self, Self::Closed)
    }
}

/// Shared half of a lease. The authority holds it as the registration's
/// callback; the [`Lease`] handle holds it to close and observe.
pub(crate) struct LeaseInner {
    id: LeaseId,
    spec: RequestSpec,
    core: Weak<MediatorCore>,
    authority: Arc<dyn ProvisioningAuthority>,
    registration: OnceLock<RegistrationId>,
    closed: AtomicBool,
    binding: watch::Sender<LeaseState>,
}

impl fmt::Debug for LeaseInner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LeaseInner")
            .field("id", &self.id)
            .field("spec", &self.spec)
            .field("registration", &self.registration.get())
            .field("state", &*self.binding.borrow())
            .finish_non_exhaustive()
    }
}

impl LeaseInner {
    pub(crate) fn new(
        id: LeaseId,
        spec: RequestSpec,
        core: Weak<MediatorCore>,
        authority: Arc<dyn ProvisioningAuthority>,
    ) -> Self {
        let (binding, _) = watch::channel(LeaseState::Unbound);
        Self {
            id,
            spec,
            core,
            authority,
            registration: OnceLock::new(),
            closed: AtomicBool::new(false),
            binding,
        }
    }

    pub(crate) fn set_registration(&self, registration: RegistrationId) {
        if self.registration.set(registration).is_err() {
            tracing::warn!(lease_id = %self.id, %registration, "registration already recorded");
        }
    }

    /// Retires a lease whose registration failed. Its spec was admitted
    /// before registering, so it is withdrawn here, along with any grant a
    /// callback recorded while the authority was still deciding. Nothing is
    /// deregistered.
    pub(crate) fn abandon(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        match self.core.upgrade() {
            Some(core) => self.retire(&core),
            None => {
                self.binding.send_replace(LeaseState::Closed);
            }
        }
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn state(&self) -> LeaseState {
        *self.binding.borrow()
    }

    fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            tracing::trace!(lease_id = %self.id, "close on closed lease ignored");
            return;
        }

        if let Some(registration) = self.registration.get() {
            self.authority.deregister(*registration);
        }

        let Some(core) = self.core.upgrade() else {
            self.binding.send_replace(LeaseState::Closed);
            tracing::debug!(lease_id = %self.id, "lease closed after mediator shutdown");
            return;
        };
        self.retire(&core);
        tracing::debug!(mediator = %core.name(), lease_id = %self.id, "lease closed");
    }

    /// Releases the grant and the demand held by this lease.
    fn retire(&self, core: &MediatorCore) {
        core.with_state(|state| {
            if let Some(network_type) = self.state().network_type() {
                state.unbind(self.id, network_type);
            }
            state.withdraw(&self.spec);
            self.binding.send_replace(LeaseState::Closed);
        });
    }
}

impl NetworkCallback for LeaseInner {
    fn on_available(&self, network: NetworkHandle) {
        let Some(core) = self.core.upgrade() else {
            return;
        };
        let network_type = core.classify(&network);

        let previous = core.with_state(|state| {
            if self.is_closed() {
                return None;
            }
            let previous = self.binding.send_replace(LeaseState::Bound {
                network,
                network_type,
            });
            state.rebind(self.id, previous.network_type(), network_type);
            Some(previous)
        });

        let Some(previous) = previous else {
            tracing::trace!(lease_id = %self.id, %network, "availability after close ignored");
            return;
        };
        tracing::debug!(
            mediator = %core.name(),
            lease_id = %self.id,
            %network,
            %network_type,
            previous = ?previous.network_type(),
            "lease bound"
        );
        core.notify_available(&network);
    }

    fn on_unavailable(&self) {
        let Some(core) = self.core.upgrade() else {
            return;
        };

        let lost = core.with_state(|state| {
            if self.is_closed() {
                return None;
            }
            let network_type = self.state().network_type()?;
            self.binding.send_replace(LeaseState::Unbound);
            state.unbind(self.id, network_type);
            Some(network_type)
        });

        if let Some(network_type) = lost {
            tracing::debug!(mediator = %core.name(), lease_id = %self.id, %network_type, "lease unbound");
        }
    }
}

/// Handle to one outstanding network request.
///
/// Dropping the handle closes the lease.
#[derive(Debug)]
pub struct Lease {
    inner: Arc<LeaseInner>,
}

impl Lease {
    pub(crate) fn new(inner: Arc<LeaseInner>) -> Self {
        Self { inner }
    }

    /// Mediator-assigned id.
    #[must_use]
    pub fn id(&self) -> LeaseId {
        self.inner.id
    }

    /// The spec this lease was requested with.
    #[must_use]
    pub fn spec(&self) -> &RequestSpec {
        &self.inner.spec
    }

    /// Id the authority assigned to this lease's registration.
    #[must_use]
    pub fn registration(&self) -> Option<RegistrationId> {
        self.inner.registration.get().copied()
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> LeaseState {
        self.inner.state()
    }

    /// Classification of the bound network, if bound.
    #[must_use]
    pub fn granted(&self) -> Option<NetworkType> {
        self.inner.state().network_type()
    }

    /// Returns true once [`Lease::close`] has run.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.is_closed()
    }

    /// Receiver over later state changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<LeaseState> {
        self.inner.binding.subscribe()
    }

    /// Stream of states, starting with the current one.
    #[must_use]
    pub fn state_stream(&self) -> WatchStream<LeaseState> {
        WatchStream::new(self.inner.binding.subscribe())
    }

    /// Waits until the lease is bound and returns the classification.
    ///
    /// Returns immediately if already bound. Any number of callers may wait
    /// at once; all of them observe the same binding.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::LeaseClosed`](crate::error::ErrorKind::LeaseClosed)
    /// if the lease is or becomes closed before a network is bound.
    pub async fn await_granted(&self) -> Result<NetworkType> {
        let mut rx = self.inner.binding.subscribe();
        loop {
            match rx.borrow_and_update() {
                LeaseState::Bound { network_type, .. } => return Ok(network_type),
                LeaseState::Closed => return Err(Error::lease_closed(self.inner.id)),
                LeaseState::Unbound => {}
            }
            if rx.changed().await.is_err() {
                return Err(Error::lease_closed(self.inner.id));
            }
        }
    }

    /// Deregisters and releases the lease. Idempotent.
    pub fn close(&self) {
        self.inner.close();
    }
}

impl Drop for Lease {
    fn drop(&mut self) {
        self.inner.close();
    }
}
