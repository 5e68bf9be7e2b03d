//! Channel primitives backing the mediator's published signals.
//!
//! # Module Contents
//!
//! - [`watch`]: single-value, replay-latest broadcast channel

pub mod watch;
