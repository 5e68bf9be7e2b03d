//! Multiset of open requests.

use std::collections::HashMap;

use crate::types::RequestSpec;

/// Multiset of the [`RequestSpec`]s of every open lease.
///
/// Structurally equal specs are counted separately, so the cardinality
/// always equals the number of open leases.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AggregatedDemand {
    entries: HashMap<RequestSpec, usize>,
    len: usize,
}

impl AggregatedDemand {
    /// Creates an empty multiset.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one instance of `spec`.
    pub fn add(&mut self, spec: RequestSpec) {
        *self.entries.entry(spec).or_insert(0) += 1;
        self.len += 1;
    }

    /// Removes one instance of `spec`.
    ///
    /// Removing a spec that is not present is a no-op and returns `false`: a
    /// lease whose registration failed may try to withdraw a spec it never
    /// added.
    pub fn remove(&mut self, spec: &RequestSpec) -> bool {
        let Some(count) = self.entries.get_mut(spec) else {
            return false;
        };
        *count -= 1;
        if *count == 0 {
            self.entries.remove(spec);
        }
        self.len -= 1;
        true
    }

    /// Number of instances of `spec`.
    #[must_use]
    pub fn count(&self, spec: &RequestSpec) -> usize {
        self.entries.get(spec).copied().unwrap_or(0)
    }

    /// Total number of entries, duplicates included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns true if there is no open request.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Single spec covering every open request, or `None` when empty.
    ///
    /// Pure function of the current contents.
    #[must_use]
    pub fn merge(&self) -> Option<RequestSpec> {
        self.entries
            .keys()
            .copied()
            .reduce(|acc, spec| acc.union(&spec))
    }
}
