//! Error types and error handling strategy for netlease.
//!
//! Errors are explicit and typed. Every [`Error`] carries an [`ErrorKind`],
//! an optional message, and an optional source.
//!
//! # Error Categories
//!
//! - **Capacity**: the outstanding-lease cap was reached
//! - **Registration**: the provisioning authority refused a request
//! - **Lifecycle**: the lease was closed
//! - **Accounting**: grant counters disagreed with lease state (a bug)
//! - **Config**: invalid configuration
//!
//! # Recovery Classification
//!
//! The mediator never retries. [`Recoverability`] tells the caller whether a
//! retry of its own could succeed.

use core::fmt;
use std::sync::Arc;

/// The kind of error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Too many outstanding registrations.
    ResourceExhausted,
    /// The provisioning authority rejected a registration.
    RegistrationFailed,
    /// The lease was closed before it was granted.
    LeaseClosed,
    /// A grant counter would have gone below zero.
    CounterUnderflow,
    /// Configuration is invalid.
    InvalidConfig,
}

impl ErrorKind {
    /// Returns the error category for this kind.
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::ResourceExhausted => ErrorCategory::Capacity,
            Self::RegistrationFailed => ErrorCategory::Registration,
            Self::LeaseClosed => ErrorCategory::Lifecycle,
            Self::CounterUnderflow => ErrorCategory::Accounting,
            Self::InvalidConfig => ErrorCategory::Config,
        }
    }

    /// Returns the recoverability classification for this error kind.
    #[must_use]
    pub const fn recoverability(&self) -> Recoverability {
        match self {
            // Capacity frees up as other leases close.
            Self::ResourceExhausted => Recoverability::Transient,
            Self::RegistrationFailed => Recoverability::Unknown,
            Self::LeaseClosed | Self::CounterUnderflow | Self::InvalidConfig => {
                Recoverability::Permanent
            }
        }
    }

    /// Returns true if a caller-driven retry may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        self.recoverability().should_retry()
    }
}

/// Classification of error recoverability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Recoverability {
    /// Temporary failure that may succeed later.
    Transient,
    /// Will not succeed on retry.
    Permanent,
    /// Depends on the collaborator that produced the error.
    Unknown,
}

impl Recoverability {
    /// Returns true if this error is safe to retry.
    #[must_use]
    pub const fn should_retry(&self) -> bool {
        matches!(self, Self::Transient)
    }

    /// Returns true if this error should never be retried.
    #[must_use]
    pub const fn is_permanent(&self) -> bool {
        matches!(self, Self::Permanent)
    }
}

/// High-level error category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Capacity limits.
    Capacity,
    /// Provisioning authority refusals.
    Registration,
    /// Use after close or after the mediator is gone.
    Lifecycle,
    /// Grant accounting bugs.
    Accounting,
    /// Configuration problems.
    Config,
}

/// The main error type for netlease operations.
#[derive(Debug, Clone)]
pub struct Error {
    kind: ErrorKind,
    message: Option<String>,
    source: Option<Arc<dyn std::error::Error + Send + Sync>>,
}

impl Error {
    /// Creates a new error with the given kind.
    #[must_use]
    pub const fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            message: None,
            source: None,
        }
    }

    /// Returns the error kind.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Adds a message to the error.
    #[must_use]
    pub fn with_message(mut self, msg: impl Into<String>) -> Self {
        self.message = Some(msg.into());
        self
    }

    /// Adds a source error to the chain.
    #[must_use]
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Arc::new(source));
        self
    }

    /// Returns the error category.
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        self.kind.category()
    }

    /// Returns the recoverability classification.
    #[must_use]
    pub const fn recoverability(&self) -> Recoverability {
        self.kind.recoverability()
    }

    /// Returns true if this error is typically retryable.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }

    /// Returns true if the outstanding-registration cap was hit.
    #[must_use]
    pub const fn is_resource_exhausted(&self) -> bool {
        matches!(self.kind, ErrorKind::ResourceExhausted)
    }

    /// Returns the error message, if any.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Creates a resource exhausted error for a cap of `limit` leases.
    #[must_use]
    pub fn resource_exhausted(limit: usize) -> Self {
        Self::new(ErrorKind::ResourceExhausted)
            .with_message(format!("outstanding lease limit of {limit} reached"))
    }

    /// Creates a lease closed error.
    #[must_use]
    pub fn lease_closed(lease_id: impl fmt::Display) -> Self {
        Self::new(ErrorKind::LeaseClosed).with_message(format!("{lease_id} closed before grant"))
    }

    /// Creates a counter underflow error.
    #[must_use]
    pub fn counter_underflow(bucket: impl fmt::Display) -> Self {
        Self::new(ErrorKind::CounterUnderflow)
            .with_message(format!("grant counter for {bucket} is already zero"))
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.kind)?;
        if let Some(msg) = &self.message {
            write!(f, ": {msg}")?;
        }
        Ok(())
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_ref().map(|e| e.as_ref() as _)
    }
}

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    /// Attach a context message on error.
    fn context(self, msg: impl Into<String>) -> Result<T>;
    /// Attach a lazily computed context message on error.
    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T>;
}

impl<T, E: Into<Error>> ResultExt<T> for core::result::Result<T, E> {
    fn context(self, msg: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.into().with_message(msg))
    }

    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T> {
        self.map_err(|e| e.into().with_message(f()))
    }
}

/// A specialized Result type for netlease operations.
pub type Result<T> = core::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[derive(Debug)]
    struct Underlying;

    impl fmt::Display for Underlying {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "underlying")
        }
    }

    impl std::error::Error for Underlying {}

    impl From<Underlying> for Error {
        fn from(e: Underlying) -> Self {
            Self::new(ErrorKind::RegistrationFailed).with_source(e)
        }
    }

    #[test]
    fn display_without_message() {
        let err = Error::new(ErrorKind::CounterUnderflow);
        assert_eq!(err.to_string(), "CounterUnderflow");
    }

    #[test]
    fn display_with_message() {
        let err = Error::resource_exhausted(100);
        assert_eq!(
            err.to_string(),
            "ResourceExhausted: outstanding lease limit of 100 reached"
        );
    }

    #[test]
    fn source_chain_is_exposed() {
        let err = Error::new(ErrorKind::RegistrationFailed)
            .with_message("outer")
            .with_source(Underlying);
        let source = err.source().expect("source missing");
        assert_eq!(source.to_string(), "underlying");
    }

    #[test]
    fn result_ext_adds_message() {
        let res: core::result::Result<(), Underlying> = Err(Underlying);
        let err = res.context("register failed").expect_err("expected err");
        assert_eq!(err.kind(), ErrorKind::RegistrationFailed);
        assert_eq!(err.to_string(), "RegistrationFailed: register failed");
    }

    #[test]
    fn recoverability_by_kind() {
        assert!(Error::resource_exhausted(1).is_retryable());
        assert!(Error::new(ErrorKind::LeaseClosed).recoverability().is_permanent());
        assert_eq!(
            ErrorKind::RegistrationFailed.recoverability(),
            Recoverability::Unknown
        );
        assert_eq!(ErrorKind::CounterUnderflow.category(), ErrorCategory::Accounting);
    }
}
