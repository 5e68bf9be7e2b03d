//! In-memory collaborators for tests and demos.
//!
//! - [`LabAuthority`]: provisioning authority the test drives by hand
//! - [`StaticClassifier`]: lookup-table classifier
//! - [`RecordingInventory`]: inventory that records notifications

mod authority;
mod classifier;

pub use authority::{LabAuthority, LabAuthorityMetrics};
pub use classifier::{RecordingInventory, StaticClassifier};
