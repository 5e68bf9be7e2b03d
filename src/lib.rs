//! netlease: concurrent network lease mediation.
//!
//! # Overview
//!
//! Many independent callers want network connectivity at the same time. Each
//! one opens a [`Lease`](mediator::Lease) describing what it needs. The
//! [`LeaseMediator`](mediator::LeaseMediator) registers every lease with a
//! provisioning authority, tracks which leases are bound to a network, and
//! publishes two replay-latest signals:
//!
//! - the **aggregated demand**: one spec covering every open request
//! - the **dominant type**: the highest-priority classification among bound
//!   leases (cellular, then wifi, then bluetooth, then unknown)
//!
//! # Core Guarantees
//!
//! - **Consistent accounting**: the demand always holds exactly the specs of
//!   open leases and the grant counters always sum to the bound leases
//! - **Idempotent close**: closing twice, or dropping after close, is a no-op
//! - **Late callbacks are harmless**: callbacks arriving after close change
//!   nothing
//! - **Cancel-safe waiting**: dropping an `await_granted` future leaves the
//!   lease untouched
//!
//! # Module Structure
//!
//! - [`types`]: Network classifications, handles and request specs
//! - [`mediator`]: Mediator, leases and the collaborator traits
//! - [`channel`]: Replay-latest watch channel used for the published signals
//! - [`stream`]: Stream adapter over watch receivers
//! - [`config`]: Mediator configuration and environment overlay
//! - [`error`]: Error types
//! - [`lab`]: In-memory authority, classifier and inventory for tests

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::module_inception)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::cast_possible_truncation)]

pub mod channel;
pub mod config;
pub mod error;
pub mod lab;
pub mod mediator;
pub mod stream;
pub mod types;

#[cfg(test)]
pub(crate) mod test_utils;

// Re-exports for convenient access to core types
pub use config::{ConfigError, MediatorConfig};
pub use error::{Error, ErrorCategory, ErrorKind, Recoverability, Result, ResultExt};
pub use mediator::{
    AggregatedDemand, GrantCounters, Lease, LeaseId, LeaseMediator, LeaseState,
    MediatorSnapshot, NetworkCallback, NetworkClassifier, NetworkInventory,
    ProvisioningAuthority, RegistrationError, RegistrationId,
};
pub use types::{Capabilities, NetworkHandle, NetworkType, RequestSpec, TransportSet};
