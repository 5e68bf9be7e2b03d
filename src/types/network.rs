//! Network classifications and concrete network handles.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Classification assigned to a concrete network by a
/// [`NetworkClassifier`](crate::mediator::NetworkClassifier).
///
/// The set is closed. "No classification" is expressed as
/// `Option::<NetworkType>::None` wherever it can occur.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NetworkType {
    /// Cellular data.
    Cellular,
    /// Wi-Fi.
    Wifi,
    /// Bluetooth tethering or proxy.
    Bluetooth,
    /// A network the classifier could not place.
    Unknown,
}

impl NetworkType {
    /// Number of classifications.
    pub const COUNT: usize = 4;

    /// Grant resolution priority, highest first.
    ///
    /// This is policy: when leases are bound to several classifications at
    /// once, the dominant one is the first entry here with a live lease.
    pub const PRIORITY: [Self; Self::COUNT] =
        [Self::Cellular, Self::Wifi, Self::Bluetooth, Self::Unknown];

    /// Dense index used for per-classification tables.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Cellular => 0,
            Self::Wifi => 1,
            Self::Bluetooth => 2,
            Self::Unknown => 3,
        }
    }

    /// Bit used for this classification in a [`TransportSet`].
    #[must_use]
    pub const fn bit(self) -> u8 {
        1 << self.index()
    }

    /// Rank in [`NetworkType::PRIORITY`]; lower is stronger.
    #[must_use]
    pub const fn priority_rank(self) -> usize {
        self.index()
    }

    /// Returns true if `self` outranks `other` for grant resolution.
    #[must_use]
    pub const fn outranks(self, other: Self) -> bool {
        self.priority_rank() < other.priority_rank()
    }

    /// Short lowercase name used in logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cellular => "cellular",
            Self::Wifi => "wifi",
            Self::Bluetooth => "bluetooth",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for NetworkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Set of transports a request accepts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransportSet(u8);

impl TransportSet {
    /// No transports.
    pub const EMPTY: Self = Self(0);

    /// Every classification.
    pub const ALL: Self = Self(0b1111);

    /// Set containing only `network_type`.
    #[must_use]
    pub const fn only(network_type: NetworkType) -> Self {
        Self(network_type.bit())
    }

    /// Returns a copy with `network_type` added.
    #[must_use]
    pub const fn with(self, network_type: NetworkType) -> Self {
        Self(self.0 | network_type.bit())
    }

    /// Returns true if `network_type` is in the set.
    #[must_use]
    pub const fn contains(self, network_type: NetworkType) -> bool {
        self.0 & network_type.bit() != 0
    }

    /// Union of both sets.
    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// Returns true if the set is empty.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Iterates members in priority order.
    pub fn iter(self) -> impl Iterator<Item = NetworkType> {
        NetworkType::PRIORITY
            .into_iter()
            .filter(move |t| self.contains(*t))
    }
}

impl FromIterator<NetworkType> for TransportSet {
    fn from_iter<I: IntoIterator<Item = NetworkType>>(iter: I) -> Self {
        iter.into_iter().fold(Self::EMPTY, Self::with)
    }
}

/// Opaque handle for a concrete network reported by the provisioning
/// authority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NetworkHandle(u64);

impl NetworkHandle {
    /// Wraps a raw authority-assigned network id.
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw network id.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for NetworkHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "net:{}", self.0)
    }
}
