//! Mediator configuration.
//!
//! [`MediatorConfig`] is built with chained setters and can be overlaid from
//! the environment:
//!
//! | Variable | Field |
//! | --- | --- |
//! | `NETLEASE_MAX_OUTSTANDING_LEASES` | `max_outstanding_leases` |
//! | `NETLEASE_NAME` | `name` |

use thiserror::Error;

use crate::error::{Error, ErrorKind};

/// Environment variable for [`MediatorConfig::max_outstanding_leases`].
pub const MAX_OUTSTANDING_ENV: &str = "NETLEASE_MAX_OUTSTANDING_LEASES";
/// Environment variable for [`MediatorConfig::name`].
pub const NAME_ENV: &str = "NETLEASE_NAME";

/// Cap on simultaneously open leases; matches the documented limit of
/// common platform connectivity services.
pub const DEFAULT_MAX_OUTSTANDING_LEASES: usize = 100;

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// An environment variable could not be parsed.
    #[error("invalid value {value:?} for {var}: {reason}")]
    InvalidEnv {
        /// Variable name.
        var: &'static str,
        /// Raw value.
        value: String,
        /// Parser message.
        reason: String,
    },
    /// The mediator name is empty.
    #[error("mediator name must not be empty")]
    EmptyName,
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::new(ErrorKind::InvalidConfig)
            .with_message(e.to_string())
            .with_source(e)
    }
}

/// Settings for a [`LeaseMediator`](crate::mediator::LeaseMediator).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediatorConfig {
    /// Maximum number of open leases; `0` disables the local guard and
    /// leaves enforcement to the provisioning authority.
    pub max_outstanding_leases: usize,
    /// Name recorded in log events.
    pub name: String,
}

impl Default for MediatorConfig {
    fn default() -> Self {
        Self {
            max_outstanding_leases: DEFAULT_MAX_OUTSTANDING_LEASES,
            name: "netlease".to_owned(),
        }
    }
}

impl MediatorConfig {
    /// Creates the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the outstanding-lease cap.
    #[must_use]
    pub fn max_outstanding_leases(mut self, max: usize) -> Self {
        self.max_outstanding_leases = max;
        self
    }

    /// Sets the mediator name.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Returns the cap if the local guard is enabled.
    #[must_use]
    pub fn lease_limit(&self) -> Option<usize> {
        (self.max_outstanding_leases > 0).then_some(self.max_outstanding_leases)
    }

    /// Default configuration overlaid with environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a variable is set but malformed, or the
    /// result fails [`MediatorConfig::validate`].
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().apply_env()
    }

    /// Overlays environment variables onto `self`.
    ///
    /// # Errors
    ///
    /// See [`MediatorConfig::from_env`].
    pub fn apply_env(mut self) -> Result<Self, ConfigError> {
        if let Ok(raw) = std::env::var(MAX_OUTSTANDING_ENV) {
            self.max_outstanding_leases =
                raw.trim()
                    .parse()
                    .map_err(|e: std::num::ParseIntError| ConfigError::InvalidEnv {
                        var: MAX_OUTSTANDING_ENV,
                        value: raw.clone(),
                        reason: e.to_string(),
                    })?;
        }
        if let Ok(name) = std::env::var(NAME_ENV) {
            self.name = name.trim().to_owned();
        }
        self.validate()?;
        Ok(self)
    }

    /// Checks the configuration for consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::EmptyName`] if `name` is blank.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::EmptyName);
        }
        Ok(())
    }
}
