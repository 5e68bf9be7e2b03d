//! Stream adapter for watch receivers.

use crate::channel::watch;
use futures_lite::Stream;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

/// Stream that yields the current value of a watch channel, then every
/// subsequent version.
///
/// Versions published while the consumer is not polling collapse into the
/// latest one.
#[derive(Debug)]
pub struct WatchStream<T> {
    inner: watch::Receiver<T>,
    has_seen_initial: bool,
}

impl<T: Clone> WatchStream<T> {
    /// Creates a stream that starts with the current value.
    #[must_use]
    pub fn new(recv: watch::Receiver<T>) -> Self {
        Self {
            inner: recv,
            has_seen_initial: false,
        }
    }

    /// Creates a stream that skips the current value.
    #[must_use]
    pub fn from_changes(recv: watch::Receiver<T>) -> Self {
        let mut stream = Self::new(recv);
        stream.inner.mark_seen();
        stream.has_seen_initial = true;
        stream
    }
}

impl<T: Clone> Stream for WatchStream<T> {
    type Item = T;

    fn poll_next(self: Pin<&mut Self>, context: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        if !this.has_seen_initial {
            this.has_seen_initial = true;
            return Poll::Ready(Some(this.inner.borrow_and_update()));
        }

        let result = {
            let mut future = this.inner.changed();
            Pin::new(&mut future).poll(context)
        };
        match result {
            // Read the value and its version under one guard, so a publish
            // that lands after `changed` is yielded once, on the next poll.
            Poll::Ready(Ok(())) => Poll::Ready(Some(this.inner.borrow_and_update())),
            Poll::Ready(Err(_)) => Poll::Ready(None),
            Poll::Pending => Poll::Pending,
        }
    }
}
