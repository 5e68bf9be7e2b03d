//! Core value types shared by the mediator and its collaborators.
//!
//! - [`NetworkType`]: closed set of network classifications and their
//!   grant priority
//! - [`NetworkHandle`]: opaque id of a concrete network
//! - [`RequestSpec`]: what a caller asks for

pub mod network;
pub mod request;

pub use network::{NetworkHandle, NetworkType, TransportSet};
pub use request::{Capabilities, RequestSpec};
