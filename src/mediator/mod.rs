//! Lease mediation between callers and a provisioning authority.
//!
//! - [`LeaseMediator`]: opens leases and publishes demand and dominant type
//! - [`Lease`]: one caller's request, bound or unbound
//! - [`AggregatedDemand`] and [`GrantCounters`]: the accounting behind the
//!   two published signals
//! - [`authority`]: traits for the provisioning authority, classifier and
//!   inventory
//!
//! All accounting lives behind a single lock. Calls out to the authority,
//! the classifier and the inventory are made without holding it.

pub mod authority;
mod demand;
mod grants;
mod lease;
#[allow(clippy::module_inception)]
mod mediator;
mod snapshot;
mod state;

pub use authority::{
    NetworkCallback, NetworkClassifier, NetworkInventory, NoopInventory, ProvisioningAuthority,
    RegistrationError, RegistrationId,
};
pub use demand::AggregatedDemand;
pub use grants::GrantCounters;
pub use lease::{Lease, LeaseId, LeaseState};
pub use mediator::{LeaseMediator, MediatorBuilder};
pub use snapshot::MediatorSnapshot;
