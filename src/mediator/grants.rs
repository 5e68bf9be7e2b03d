//! Per-classification counters of bound leases.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::NetworkType;

/// Number of currently bound leases per [`NetworkType`].
///
/// The sum of all counters equals the number of bound leases. A decrement
/// that would go below zero means a callback was applied twice or out of
/// order; it is reported as an error and the counter stays at zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrantCounters {
    counts: [usize; NetworkType::COUNT],
}

impl GrantCounters {
    /// All counters at zero.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            counts: [0; NetworkType::COUNT],
        }
    }

    /// Records one more lease bound to `network_type`.
    pub fn increment(&mut self, network_type: NetworkType) {
        self.counts[network_type.index()] += 1;
    }

    /// Records one fewer lease bound to `network_type`.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::CounterUnderflow`](crate::error::ErrorKind::CounterUnderflow)
    /// if the counter is already zero; the counter is left unchanged.
    pub fn decrement(&mut self, network_type: NetworkType) -> Result<()> {
        let slot = &mut self.counts[network_type.index()];
        *slot = slot
            .checked_sub(1)
            .ok_or_else(|| Error::counter_underflow(network_type))?;
        Ok(())
    }

    /// Current count for `network_type`.
    #[must_use]
    pub const fn count(&self, network_type: NetworkType) -> usize {
        self.counts[network_type.index()]
    }

    /// Number of bound leases across all classifications.
    #[must_use]
    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }

    /// Highest-priority classification with a live lease.
    #[must_use]
    pub fn resolve(&self) -> Option<NetworkType> {
        NetworkType::PRIORITY
            .into_iter()
            .find(|t| self.count(*t) > 0)
    }

    /// `(classification, count)` pairs in priority order.
    pub fn iter(&self) -> impl Iterator<Item = (NetworkType, usize)> + '_ {
        NetworkType::PRIORITY
            .into_iter()
            .map(|t| (t, self.count(t)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn init_test(name: &str) {
        crate::test_utils::init_test_logging();
        crate::test_phase!(name);
    }

    #[test]
    fn resolve_follows_priority() {
        init_test("resolve_follows_priority");
        let mut grants = GrantCounters::new();
        crate::assert_with_log!(grants.resolve().is_none(), "empty", "None", grants.resolve());

        grants.increment(NetworkType::Bluetooth);
        grants.increment(NetworkType::Wifi);
        let dominant = grants.resolve();
        crate::assert_with_log!(
            dominant == Some(NetworkType::Wifi),
            "wifi beats bluetooth",
            Some(NetworkType::Wifi),
            dominant
        );

        grants.increment(NetworkType::Cellular);
        let dominant = grants.resolve();
        crate::assert_with_log!(
            dominant == Some(NetworkType::Cellular),
            "cellular beats wifi",
            Some(NetworkType::Cellular),
            dominant
        );

        grants.decrement(NetworkType::Cellular).expect("decrement");
        grants.decrement(NetworkType::Wifi).expect("decrement");
        let dominant = grants.resolve();
        crate::assert_with_log!(
            dominant == Some(NetworkType::Bluetooth),
            "falls back",
            Some(NetworkType::Bluetooth),
            dominant
        );
        crate::test_complete!("resolve_follows_priority");
    }

    #[test]
    fn underflow_is_reported_not_wrapped() {
        init_test("underflow_is_reported_not_wrapped");
        let mut grants = GrantCounters::new();
        let err = grants
            .decrement(NetworkType::Wifi)
            .expect_err("underflow must be detected");
        crate::assert_with_log!(
            err.kind() == ErrorKind::CounterUnderflow,
            "kind",
            ErrorKind::CounterUnderflow,
            err.kind()
        );
        let count = grants.count(NetworkType::Wifi);
        crate::assert_with_log!(count == 0, "still zero", 0, count);
        crate::assert_with_log!(grants.resolve().is_none(), "resolve unaffected", "None", grants.resolve());
        crate::test_complete!("underflow_is_reported_not_wrapped");
    }

    #[test]
    fn same_bucket_decrement_then_increment_is_net_zero() {
        init_test("same_bucket_decrement_then_increment_is_net_zero");
        let mut grants = GrantCounters::new();
        grants.increment(NetworkType::Wifi);
        let before = grants;
        grants.increment(NetworkType::Wifi);
        grants.decrement(NetworkType::Wifi).expect("decrement");
        crate::assert_with_log!(grants == before, "net zero", before, grants);
        crate::test_complete!("same_bucket_decrement_then_increment_is_net_zero");
    }

    #[test]
    fn total_and_iter_agree() {
        init_test("total_and_iter_agree");
        let mut grants = GrantCounters::new();
        grants.increment(NetworkType::Wifi);
        grants.increment(NetworkType::Wifi);
        grants.increment(NetworkType::Unknown);
        let summed: usize = grants.iter().map(|(_, n)| n).sum();
        crate::assert_with_log!(summed == grants.total(), "sum", grants.total(), summed);
        crate::assert_with_log!(grants.total() == 3, "total", 3, grants.total());
        let first = grants.iter().next();
        crate::assert_with_log!(
            first == Some((NetworkType::Cellular, 0)),
            "priority order",
            Some((NetworkType::Cellular, 0)),
            first
        );
        crate::test_complete!("total_and_iter_agree");
    }
}
