//! Request descriptors.

use core::fmt;

use serde::{Deserialize, Serialize};

use super::network::{NetworkType, TransportSet};

/// Capability bits a request requires from the network.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Capabilities(u32);

impl Capabilities {
    /// No requirements.
    pub const NONE: Self = Self(0);
    /// Network must reach the internet.
    pub const INTERNET: Self = Self(1 << 0);
    /// Network must not be metered.
    pub const NOT_METERED: Self = Self(1 << 1);
    /// Network connectivity must be validated.
    pub const VALIDATED: Self = Self(1 << 2);
    /// Network must not be a VPN.
    pub const NOT_VPN: Self = Self(1 << 3);

    /// Builds from raw bits.
    #[must_use]
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    /// Raw bits.
    #[must_use]
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Union of both sets of requirements.
    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// Returns true if every bit of `other` is set in `self`.
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl core::ops::BitOr for Capabilities {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

/// What a caller asks the mediator for.
///
/// Immutable once built and compared by value: two leases built from equal
/// specs still count as two entries in the aggregated demand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestSpec {
    transports: TransportSet,
    capabilities: Capabilities,
    min_bandwidth_kbps: Option<u32>,
}

impl RequestSpec {
    /// Request accepting any of `transports`, requiring internet access.
    #[must_use]
    pub const fn new(transports: TransportSet) -> Self {
        Self {
            transports,
            capabilities: Capabilities::INTERNET,
            min_bandwidth_kbps: None,
        }
    }

    /// Request for a single transport.
    #[must_use]
    pub const fn for_transport(network_type: NetworkType) -> Self {
        Self::new(TransportSet::only(network_type))
    }

    /// Request for either Wi-Fi or cellular, the usual high-bandwidth pair.
    #[must_use]
    pub const fn high_bandwidth() -> Self {
        Self::new(TransportSet::only(NetworkType::Wifi).with(NetworkType::Cellular))
    }

    /// Replaces the required capabilities.
    #[must_use]
    pub const fn with_capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    /// Sets a minimum downstream bandwidth hint.
    #[must_use]
    pub const fn with_min_bandwidth_kbps(mut self, kbps: u32) -> Self {
        self.min_bandwidth_kbps = Some(kbps);
        self
    }

    /// Accepted transports.
    #[must_use]
    pub const fn transports(&self) -> TransportSet {
        self.transports
    }

    /// Required capabilities.
    #[must_use]
    pub const fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    /// Minimum bandwidth hint, if any.
    #[must_use]
    pub const fn min_bandwidth_kbps(&self) -> Option<u32> {
        self.min_bandwidth_kbps
    }

    /// Combines two specs into one whose requirements cover both.
    ///
    /// Transports and capabilities are unioned; the bandwidth hint is the
    /// wider of the two.
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        Self {
            transports: self.transports.union(other.transports),
            capabilities: self.capabilities.union(other.capabilities),
            min_bandwidth_kbps: match (self.min_bandwidth_kbps, other.min_bandwidth_kbps) {
                (Some(a), Some(b)) => Some(a.max(b)),
                (a, b) => a.or(b),
            },
        }
    }
}

impl fmt::Display for RequestSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, t) in self.transports.iter().enumerate() {
            if i > 0 {
                f.write_str("|")?;
            }
            write!(f, "{t}")?;
        }
        write!(f, "] caps={:#x}", self.capabilities.bits())?;
        if let Some(kbps) = self.min_bandwidth_kbps {
            write!(f, " min={kbps}kbps")?;
        }
        Ok(())
    }
}
