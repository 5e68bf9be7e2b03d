//! The lease mediator.

use std::sync::Arc;

use super::authority::{
    NetworkCallback, NetworkClassifier, NetworkInventory, NoopInventory, ProvisioningAuthority,
};
use super::lease::{Lease, LeaseInner};
use super::snapshot::MediatorSnapshot;
use super::state::MediatorCore;
use crate::channel::watch;
use crate::config::MediatorConfig;
use crate::error::Result;
use crate::stream::WatchStream;
use crate::types::{NetworkType, RequestSpec};

/// Arbitrates network requests from many independent callers.
///
/// Every open lease contributes its [`RequestSpec`] to the aggregated
/// demand. Every bound lease contributes its classification to the grant
/// counters. Both are republished to subscribers after each change:
///
/// - [`LeaseMediator::demand`]: union of all open requests
/// - [`LeaseMediator::dominant`]: highest-priority classification with a
///   bound lease
///
/// Cloning is cheap; clones share state. Once every clone is dropped,
/// outstanding leases can still be closed but their callbacks no longer
/// change anything.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use netlease::lab::{LabAuthority, StaticClassifier};
/// use netlease::mediator::LeaseMediator;
/// use netlease::types::{NetworkHandle, NetworkType, RequestSpec};
///
/// let authority = Arc::new(LabAuthority::new());
/// let classifier = Arc::new(StaticClassifier::new().with(NetworkHandle::new(1), NetworkType::Wifi));
/// let mediator = LeaseMediator::new(authority.clone(), classifier);
///
/// let lease = mediator.request_lease(RequestSpec::high_bandwidth()).unwrap();
/// authority.make_available(lease.registration().unwrap(), NetworkHandle::new(1));
///
/// let granted = futures_lite::future::block_on(lease.await_granted()).unwrap();
/// assert_eq!(granted, NetworkType::Wifi);
/// assert_eq!(*mediator.dominant().borrow(), Some(NetworkType::Wifi));
/// ```
#[derive(Debug, Clone)]
pub struct LeaseMediator {
    core: Arc<MediatorCore>,
}

impl LeaseMediator {
    /// Creates a mediator with the default configuration and no inventory.
    pub fn new(
        authority: Arc<dyn ProvisioningAuthority>,
        classifier: Arc<dyn NetworkClassifier>,
    ) -> Self {
        Self::from_parts(
            MediatorConfig::default(),
            authority,
            classifier,
            Arc::new(NoopInventory),
        )
    }

    /// Starts a builder for a mediator with a custom configuration or
    /// inventory.
    pub fn builder(
        authority: Arc<dyn ProvisioningAuthority>,
        classifier: Arc<dyn NetworkClassifier>,
    ) -> MediatorBuilder {
        MediatorBuilder {
            config: MediatorConfig::default(),
            authority,
            classifier,
            inventory: Arc::new(NoopInventory),
        }
    }

    fn from_parts(
        config: MediatorConfig,
        authority: Arc<dyn ProvisioningAuthority>,
        classifier: Arc<dyn NetworkClassifier>,
        inventory: Arc<dyn NetworkInventory>,
    ) -> Self {
        tracing::info!(
            mediator = %config.name,
            max_outstanding_leases = config.max_outstanding_leases,
            "lease mediator created"
        );
        Self {
            core: Arc::new(MediatorCore::new(config, authority, classifier, inventory)),
        }
    }

    /// Opens a lease for `spec`.
    ///
    /// The spec joins the aggregated demand first and is then registered
    /// with the provisioning authority. The lease starts unbound; a callback
    /// the authority fires during registration binds it as usual.
    ///
    /// # Errors
    ///
    /// - [`ErrorKind::ResourceExhausted`](crate::error::ErrorKind::ResourceExhausted)
    ///   if the configured lease cap or the authority's own limit is reached
    /// - [`ErrorKind::RegistrationFailed`](crate::error::ErrorKind::RegistrationFailed)
    ///   if the authority rejects the request
    ///
    /// On error the spec is withdrawn again and no grant is left behind.
    pub fn request_lease(&self, spec: RequestSpec) -> Result<Lease> {
        if let Err(err) = self.core.admit_within_cap(spec) {
            tracing::warn!(mediator = %self.core.name(), %spec, error = %err, "lease request refused");
            return Err(err);
        }

        let id = self.core.next_lease_id();
        let inner = Arc::new(LeaseInner::new(
            id,
            spec,
            Arc::downgrade(&self.core),
            Arc::clone(self.core.authority()),
        ));
        let callback: Arc<dyn NetworkCallback> = Arc::clone(&inner) as _;

        match self.core.authority().register(&spec, callback) {
            Ok(registration) => {
                inner.set_registration(registration);
                tracing::debug!(
                    mediator = %self.core.name(),
                    lease_id = %id,
                    %registration,
                    %spec,
                    "lease opened"
                );
                Ok(Lease::new(inner))
            }
            Err(err) => {
                inner.abandon();
                tracing::warn!(
                    mediator = %self.core.name(),
                    lease_id = %id,
                    %spec,
                    error = %err,
                    "registration failed"
                );
                Err(err.into())
            }
        }
    }

    /// Receiver of the merged demand. The current value is readable at once
    /// through [`watch::Receiver::borrow`].
    #[must_use]
    pub fn demand(&self) -> watch::Receiver<Option<RequestSpec>> {
        self.core.subscribe_demand()
    }

    /// Receiver of the dominant classification.
    #[must_use]
    pub fn dominant(&self) -> watch::Receiver<Option<NetworkType>> {
        self.core.subscribe_dominant()
    }

    /// Stream of merged demand values, starting with the current one.
    #[must_use]
    pub fn demand_stream(&self) -> WatchStream<Option<RequestSpec>> {
        WatchStream::new(self.demand())
    }

    /// Stream of dominant classifications, starting with the current one.
    #[must_use]
    pub fn dominant_stream(&self) -> WatchStream<Option<NetworkType>> {
        WatchStream::new(self.dominant())
    }

    /// Consistent view of the current accounting.
    #[must_use]
    pub fn snapshot(&self) -> MediatorSnapshot {
        self.core.snapshot()
    }

    /// Number of leases that are open.
    #[must_use]
    pub fn open_leases(&self) -> usize {
        self.core.snapshot().open_leases
    }

    /// Configured name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.core.name()
    }
}

/// Builder for [`LeaseMediator`].
pub struct MediatorBuilder {
    config: MediatorConfig,
    authority: Arc<dyn ProvisioningAuthority>,
    classifier: Arc<dyn NetworkClassifier>,
    inventory: Arc<dyn NetworkInventory>,
}

impl std::fmt::Debug for MediatorBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediatorBuilder")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl MediatorBuilder {
    /// Replaces the configuration.
    #[must_use]
    pub fn config(mut self, config: MediatorConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the inventory notified when a lease becomes bound.
    #[must_use]
    pub fn inventory(mut self, inventory: Arc<dyn NetworkInventory>) -> Self {
        self.inventory = inventory;
        self
    }

    /// Validates the configuration and builds the mediator.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::InvalidConfig`](crate::error::ErrorKind::InvalidConfig)
    /// if the configuration fails validation.
    pub fn build(self) -> Result<LeaseMediator> {
        self.config.validate()?;
        Ok(LeaseMediator::from_parts(
            self.config,
            self.authority,
            self.classifier,
            self.inventory,
        ))
    }
}
