//! Stream adapters over the mediator's published signals.
//!
//! - [`WatchStream`]: yields the current value of a watch channel, then each
//!   later version

mod watch_stream;

pub use watch_stream::WatchStream;
