#![allow(dead_code)]
#![allow(unused_imports)]
//! Shared integration test utilities.
//!
//! Import with:
//! ```
//! mod common;
//! use common::*;
//! ```

use netlease::lab::{LabAuthority, RecordingInventory, StaticClassifier};
use netlease::{
    Lease, LeaseMediator, MediatorConfig, MediatorSnapshot, NetworkHandle, NetworkType,
    RegistrationId,
};
use proptest::prelude::ProptestConfig;
use proptest::test_runner::RngSeed;
use std::sync::{Arc, Once};
use std::time::{Duration, Instant};
use tracing_subscriber::fmt::format::FmtSpan;

static INIT_LOGGING: Once = Once::new();

/// Default seed for property tests when running under CI.
pub const DEFAULT_PROPTEST_SEED: u64 = 0x5EED5EED;

const PROPTEST_SEED_ENV: &str = "NETLEASE_PROPTEST_SEED";
const PROPTEST_MAX_SHRINK_ITERS_ENV: &str = "NETLEASE_PROPTEST_MAX_SHRINK_ITERS";

/// Cellular network in the standard fixture.
pub const CELL: NetworkHandle = NetworkHandle::new(10);
/// Wifi network in the standard fixture.
pub const WIFI: NetworkHandle = NetworkHandle::new(20);
/// Second wifi network in the standard fixture.
pub const WIFI_ALT: NetworkHandle = NetworkHandle::new(21);
/// Bluetooth network in the standard fixture.
pub const BT: NetworkHandle = NetworkHandle::new(30);
/// Network the fixture classifier does not know.
pub const STRAY: NetworkHandle = NetworkHandle::new(99);

/// Configuration for property tests with optional deterministic seed support.
#[derive(Debug, Clone)]
pub struct PropertyTestConfig {
    /// Fixed seed for reproducibility (overrides CI default when set).
    pub seed: Option<u64>,
    /// Number of successful cases required.
    pub cases: u32,
    /// Maximum shrink iterations.
    pub max_shrink_iters: u32,
}

impl PropertyTestConfig {
    /// Build a config with defaults for property tests.
    #[must_use]
    pub fn new(cases: u32) -> Self {
        Self {
            seed: read_proptest_seed(),
            cases,
            max_shrink_iters: read_max_shrink_iters()
                .unwrap_or(ProptestConfig::default().max_shrink_iters),
        }
    }

    /// Convert into a ProptestConfig, applying deterministic seed rules.
    #[must_use]
    pub fn to_proptest_config(&self) -> ProptestConfig {
        let mut config = ProptestConfig::with_cases(self.cases);

        // Honor existing PROPTEST_RNG_SEED, otherwise apply our own.
        if matches!(config.rng_seed, RngSeed::Random) {
            if let Some(seed) = self.seed {
                config.rng_seed = RngSeed::Fixed(seed);
            }
        }

        config.max_shrink_iters = self.max_shrink_iters;
        config
    }
}

/// Build a ProptestConfig with deterministic seed support for CI.
#[must_use]
pub fn test_proptest_config(cases: u32) -> ProptestConfig {
    PropertyTestConfig::new(cases).to_proptest_config()
}

fn read_proptest_seed() -> Option<u64> {
    if let Ok(value) = std::env::var(PROPTEST_SEED_ENV) {
        return value.parse::<u64>().ok();
    }

    // If CI is set and no explicit seed is provided, use a fixed seed.
    if std::env::var("CI").is_ok() {
        return Some(DEFAULT_PROPTEST_SEED);
    }

    None
}

fn read_max_shrink_iters() -> Option<u32> {
    std::env::var(PROPTEST_MAX_SHRINK_ITERS_ENV)
        .ok()
        .and_then(|value| value.parse::<u32>().ok())
}

/// Initialize test logging with trace-level output.
pub fn init_test_logging() {
    init_test_logging_with_level(tracing::Level::TRACE);
}

/// Initialize test logging with a custom level.
pub fn init_test_logging_with_level(level: tracing::Level) {
    INIT_LOGGING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_max_level(level)
            .with_test_writer()
            .with_file(true)
            .with_line_number(true)
            .with_target(true)
            .with_thread_ids(true)
            .with_span_events(FmtSpan::CLOSE)
            .with_ansi(false)
            .try_init();
    });
}

/// A mediator wired to lab collaborators.
pub struct Fixture {
    /// Test-driven authority.
    pub authority: Arc<LabAuthority>,
    /// Classifier knowing [`CELL`], [`WIFI`], [`WIFI_ALT`] and [`BT`].
    pub classifier: Arc<StaticClassifier>,
    /// Records every notification.
    pub inventory: Arc<RecordingInventory>,
    /// The mediator under test.
    pub mediator: LeaseMediator,
}

impl Fixture {
    /// Fixture with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(MediatorConfig::default(), LabAuthority::new())
    }

    /// Fixture with a custom configuration and authority.
    #[must_use]
    pub fn with_config(config: MediatorConfig, authority: LabAuthority) -> Self {
        let authority = Arc::new(authority);
        let classifier = Arc::new(
            StaticClassifier::new()
                .with(CELL, NetworkType::Cellular)
                .with(WIFI, NetworkType::Wifi)
                .with(WIFI_ALT, NetworkType::Wifi)
                .with(BT, NetworkType::Bluetooth),
        );
        let inventory = Arc::new(RecordingInventory::new());
        let mediator = LeaseMediator::builder(authority.clone(), classifier.clone())
            .config(config)
            .inventory(inventory.clone())
            .build()
            .expect("valid fixture config");
        Self {
            authority,
            classifier,
            inventory,
            mediator,
        }
    }

    /// Delivers `network` to `lease`.
    pub fn bind(&self, lease: &Lease, network: NetworkHandle) {
        assert!(
            self.authority.make_available(registration(lease), network),
            "lease {} is not registered",
            lease.id()
        );
    }

    /// Reports the network of `lease` lost.
    pub fn unbind(&self, lease: &Lease) {
        assert!(
            self.authority.make_unavailable(registration(lease)),
            "lease {} is not registered",
            lease.id()
        );
    }
}

impl Default for Fixture {
    fn default() -> Self {
        Self::new()
    }
}

/// Registration id of a lease that registered successfully.
#[must_use]
pub fn registration(lease: &Lease) -> RegistrationId {
    lease.registration().expect("lease registered")
}

/// Checks the snapshot against the leases the test believes are open.
pub fn assert_accounting(snapshot: &MediatorSnapshot, open: &[Lease]) {
    assert_eq!(snapshot.open_leases, open.len(), "open leases");
    let bound: Vec<NetworkType> = open.iter().filter_map(Lease::granted).collect();
    assert_eq!(snapshot.bound_leases, bound.len(), "bound leases");
    for network_type in NetworkType::PRIORITY {
        let expected = bound.iter().filter(|t| **t == network_type).count();
        assert_eq!(
            snapshot.grants.count(network_type),
            expected,
            "grants for {network_type}"
        );
    }
    let dominant = NetworkType::PRIORITY
        .into_iter()
        .find(|t| bound.contains(t));
    assert_eq!(snapshot.dominant, dominant, "dominant");
    let merged = open
        .iter()
        .map(|lease| *lease.spec())
        .reduce(|acc, spec| acc.union(&spec));
    assert_eq!(snapshot.demand, merged, "demand");
}

/// Polls `condition` until it holds or `timeout` elapses.
pub fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::yield_now();
    }
    condition()
}

/// Log a test phase transition with a visual separator.
#[macro_export]
macro_rules! test_phase {
    ($name:expr) => {
        tracing::info!(phase = %$name, "========================================");
        tracing::info!(phase = %$name, "TEST PHASE: {}", $name);
        tracing::info!(phase = %$name, "========================================");
    };
}

/// Log a section within a test phase.
#[macro_export]
macro_rules! test_section {
    ($name:expr) => {
        tracing::debug!(section = %$name, "--- {} ---", $name);
    };
}

/// Log test completion with summary.
#[macro_export]
macro_rules! test_complete {
    ($name:expr) => {
        tracing::info!(test = %$name, "test completed successfully: {}", $name);
    };
    ($name:expr, $($key:ident = $value:expr),* $(,)?) => {
        tracing::info!(
            test = %$name,
            $($key = %$value,)*
            "test completed successfully: {}",
            $name
        );
    };
}

/// Log before assertions for context.
#[macro_export]
macro_rules! assert_with_log {
    ($cond:expr, $msg:expr, $expected:expr, $actual:expr) => {
        tracing::debug!(
            expected = ?$expected,
            actual = ?$actual,
            "Asserting: {}",
            $msg
        );
        assert!($cond, "{}: expected {:?}, got {:?}", $msg, $expected, $actual);
    };
}
