//! Interfaces of the external collaborators the mediator drives.
//!
//! None of these are implemented here beyond the in-memory versions in
//! [`crate::lab`]. Real deployments wrap the platform connectivity service.

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::error::{Error, ErrorKind};
use crate::types::{NetworkHandle, NetworkType, RequestSpec};

/// Id the provisioning authority assigns to a registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RegistrationId(u64);

impl RegistrationId {
    /// Wraps an authority-assigned id.
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw id.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RegistrationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "reg:{}", self.0)
    }
}

/// Reasons the provisioning authority refuses a registration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistrationError {
    /// The authority's outstanding-registration cap is reached.
    #[error("registration limit of {limit} reached")]
    LimitExceeded {
        /// The authority's cap.
        limit: usize,
    },
    /// Any other refusal.
    #[error("registration rejected: {0}")]
    Rejected(String),
}

impl From<RegistrationError> for Error {
    fn from(e: RegistrationError) -> Self {
        let kind = match e {
            RegistrationError::LimitExceeded { .. } => ErrorKind::ResourceExhausted,
            RegistrationError::Rejected(_) => ErrorKind::RegistrationFailed,
        };
        Self::new(kind).with_message(e.to_string()).with_source(e)
    }
}

/// Callbacks the provisioning authority delivers for one registration.
///
/// Calls may arrive on any thread, concurrently with calls for other
/// registrations.
pub trait NetworkCallback: Send + Sync {
    /// A network satisfying the request is available.
    fn on_available(&self, network: NetworkHandle);

    /// The network previously reported available is gone.
    fn on_unavailable(&self);
}

/// The system that brings networks up and down.
pub trait ProvisioningAuthority: Send + Sync {
    /// Asks for a network matching `spec`; availability is reported through
    /// `callback`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistrationError::LimitExceeded`] when too many
    /// registrations are outstanding.
    fn register(
        &self,
        spec: &RequestSpec,
        callback: Arc<dyn NetworkCallback>,
    ) -> Result<RegistrationId, RegistrationError>;

    /// Withdraws a registration. Callbacks may stop at any point after this
    /// is called.
    fn deregister(&self, id: RegistrationId);
}

/// Maps a concrete network to its classification.
pub trait NetworkClassifier: Send + Sync {
    /// Classifies `network`. Must be a pure lookup.
    fn classify(&self, network: &NetworkHandle) -> NetworkType;
}

/// Bookkeeping of known networks, notified when one becomes available.
pub trait NetworkInventory: Send + Sync {
    /// Records that `network` became available. Fire-and-forget.
    fn notify_available(&self, network: &NetworkHandle);
}

/// Inventory that ignores every notification.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopInventory;

impl NetworkInventory for NoopInventory {
    fn notify_available(&self, _network: &NetworkHandle) {}
}

impl<F> NetworkClassifier for F
where
    F: Fn(&NetworkHandle) -> NetworkType + Send + Sync,
{
    fn classify(&self, network: &NetworkHandle) -> NetworkType {
        self(network)
    }
}
