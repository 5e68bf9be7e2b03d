//! Latest-value watch channel used for the mediator's published signals.
//!
//! A watch channel holds a single value. Every receiver can read the latest
//! value at any time and wait for the next version. There is no queue: a slow
//! receiver that misses intermediate versions only ever observes the newest
//! one.
//!
//! # Watch Semantics
//!
//! - One sender publishes; any number of receivers observe
//! - Each publication bumps a version number, even if the value is equal
//! - Receivers track the last version they have seen
//! - Waiting receivers are woken on every publication
//!
//! # Cancel Safety
//!
//! [`Receiver::changed`] is cancel-safe. Dropping the future before it
//! resolves leaves `seen_version` untouched, so a later call waits for the
//! same version again.
//!
//! # Example
//!
//! ```
//! use netlease::channel::watch;
//!
//! let (tx, rx) = watch::channel(0_u32);
//! tx.send_replace(7);
//! assert_eq!(*rx.borrow(), 7);
//! assert!(rx.has_changed());
//! ```

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll, Waker};

use parking_lot::{Mutex, RwLock, RwLockReadGuard};

/// Waiter entry with a queued flag shared with the owning receiver.
///
/// The flag lets a re-polled future refresh its waker instead of pushing a
/// second entry.
struct WatchWaiter {
    waker: Waker,
    queued: Arc<AtomicBool>,
}

impl std::fmt::Debug for WatchWaiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatchWaiter")
            .field("waker", &self.waker)
            .field("queued", &self.queued.load(Ordering::Relaxed))
            .finish()
    }
}

/// Error returned by [`Sender::send`] when no receiver is left.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SendError<T>(pub T);

impl<T> std::fmt::Display for SendError<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "sending on a closed watch channel")
    }
}

impl<T: std::fmt::Debug> std::error::Error for SendError<T> {}

/// Error returned by [`Receiver::changed`] once the sender is gone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecvError;

impl std::fmt::Display for RecvError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "watch channel sender was dropped")
    }
}

impl std::error::Error for RecvError {}

#[derive(Debug)]
struct WatchInner<T> {
    /// Current value and its version.
    value: RwLock<(T, u64)>,
    receiver_count: AtomicUsize,
    sender_dropped: AtomicBool,
    waiters: Mutex<Vec<WatchWaiter>>,
}

impl<T> WatchInner<T> {
    fn new(initial: T) -> Self {
        Self {
            value: RwLock::new((initial, 0)),
            receiver_count: AtomicUsize::new(1),
            sender_dropped: AtomicBool::new(false),
            waiters: Mutex::new(Vec::new()),
        }
    }

    fn is_sender_dropped(&self) -> bool {
        self.sender_dropped.load(Ordering::Acquire)
    }

    fn current_version(&self) -> u64 {
        self.value.read().1
    }

    fn wake_all_waiters(&self) {
        let waiters = std::mem::take(&mut *self.waiters.lock());
        for w in waiters {
            w.queued.store(false, Ordering::Release);
            w.waker.wake();
        }
    }

    fn register_waker(&self, waiter: WatchWaiter) {
        let mut waiters = self.waiters.lock();
        // Entries whose future was dropped only live on in this vec.
        waiters.retain(|entry| Arc::strong_count(&entry.queued) > 1);
        if let Some(existing) = waiters
            .iter_mut()
            .find(|entry| Arc::ptr_eq(&entry.queued, &waiter.queued))
        {
            if !existing.waker.will_wake(&waiter.waker) {
                existing.waker = waiter.waker;
            }
            return;
        }
        waiters.push(waiter);
    }

    fn waiter_count(&self) -> usize {
        self.waiters.lock().len()
    }
}

/// Creates a new watch channel holding `initial`.
#[must_use]
pub fn channel<T>(initial: T) -> (Sender<T>, Receiver<T>) {
    let inner = Arc::new(WatchInner::new(initial));
    (
        Sender {
            inner: Arc::clone(&inner),
        },
        Receiver {
            inner,
            seen_version: 0,
            waiter: None,
        },
    )
}

/// The publishing half of a watch channel.
#[derive(Debug)]
pub struct Sender<T> {
    inner: Arc<WatchInner<T>>,
}

impl<T> Sender<T> {
    /// Publishes `value` if at least one receiver is alive.
    ///
    /// # Errors
    ///
    /// Returns the value back in [`SendError`] when every receiver has been
    /// dropped.
    pub fn send(&self, value: T) -> Result<(), SendError<T>> {
        if self.is_closed() {
            return Err(SendError(value));
        }
        self.send_replace(value);
        Ok(())
    }

    /// Publishes `value` unconditionally and returns the previous value.
    ///
    /// The version is bumped even when nobody is subscribed, so receivers
    /// created later observe the latest state through [`Sender::subscribe`].
    pub fn send_replace(&self, value: T) -> T {
        let previous = {
            let mut guard = self.inner.value.write();
            guard.1 += 1;
            std::mem::replace(&mut guard.0, value)
        };
        self.inner.wake_all_waiters();
        previous
    }

    /// Modifies the value in place and publishes a new version.
    pub fn send_modify<F>(&self, f: F)
    where
        F: FnOnce(&mut T),
    {
        {
            let mut guard = self.inner.value.write();
            f(&mut guard.0);
            guard.1 += 1;
        }
        self.inner.wake_all_waiters();
    }

    /// Returns a read guard over the current value.
    #[must_use]
    pub fn borrow(&self) -> Ref<'_, T> {
        Ref {
            guard: self.inner.value.read(),
        }
    }

    /// Creates a receiver that has already seen the current version.
    ///
    /// The new receiver reads the current value through [`Receiver::borrow`]
    /// and is woken by the next publication.
    #[must_use]
    pub fn subscribe(&self) -> Receiver<T> {
        self.inner.receiver_count.fetch_add(1, Ordering::AcqRel);
        Receiver {
            inner: Arc::clone(&self.inner),
            seen_version: self.inner.current_version(),
            waiter: None,
        }
    }

    /// Returns the number of live receivers.
    #[must_use]
    pub fn receiver_count(&self) -> usize {
        self.inner.receiver_count.load(Ordering::Acquire)
    }

    /// Returns true if every receiver has been dropped.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.receiver_count() == 0
    }

    /// Returns the current version number.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.inner.current_version()
    }

    #[cfg(test)]
    pub(crate) fn waiter_count(&self) -> usize {
        self.inner.waiter_count()
    }
}

impl<T> Drop for Sender<T> {
    fn drop(&mut self) {
        self.inner.sender_dropped.store(true, Ordering::Release);
        self.inner.wake_all_waiters();
    }
}

/// The observing half of a watch channel.
///
/// Receivers are cheap to clone; each clone tracks its own seen version.
#[derive(Debug)]
pub struct Receiver<T> {
    inner: Arc<WatchInner<T>>,
    seen_version: u64,
    /// Queued flag shared with our entry in the waiter list.
    waiter: Option<Arc<AtomicBool>>,
}

impl<T> Receiver<T> {
    /// Waits until a version newer than `seen_version` is published.
    ///
    /// # Errors
    ///
    /// Resolves to [`RecvError`] once the sender is dropped and the latest
    /// version has already been seen.
    pub fn changed(&mut self) -> Changed<'_, T> {
        // A previous future may have been dropped while queued.
        self.waiter = None;
        Changed { receiver: self }
    }

    /// Returns a read guard over the current value without marking it seen.
    #[must_use]
    pub fn borrow(&self) -> Ref<'_, T> {
        Ref {
            guard: self.inner.value.read(),
        }
    }

    /// Returns a clone of the current value and marks it seen.
    #[must_use]
    pub fn borrow_and_update(&mut self) -> T
    where
        T: Clone,
    {
        let guard = self.inner.value.read();
        self.seen_version = guard.1;
        guard.0.clone()
    }

    /// Marks the current version as seen.
    pub fn mark_seen(&mut self) {
        self.seen_version = self.inner.current_version();
    }

    /// Returns true if a version newer than the last seen one exists.
    #[must_use]
    pub fn has_changed(&self) -> bool {
        self.inner.current_version() > self.seen_version
    }

    /// Returns true if the sender has been dropped.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.is_sender_dropped()
    }

    /// Returns the version last seen by this receiver.
    #[must_use]
    pub fn seen_version(&self) -> u64 {
        self.seen_version
    }

    fn take_new_version(&mut self) -> bool {
        let current = self.inner.current_version();
        if current > self.seen_version {
            self.seen_version = current;
            true
        } else {
            false
        }
    }
}

impl<T> Clone for Receiver<T> {
    fn clone(&self) -> Self {
        self.inner.receiver_count.fetch_add(1, Ordering::AcqRel);
        Self {
            inner: Arc::clone(&self.inner),
            seen_version: self.seen_version,
            waiter: None,
        }
    }
}

impl<T> Drop for Receiver<T> {
    fn drop(&mut self) {
        let _ = self
            .inner
            .receiver_count
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                Some(n.saturating_sub(1))
            });
    }
}

/// Future returned by [`Receiver::changed`].
#[derive(Debug)]
pub struct Changed<'a, T> {
    receiver: &'a mut Receiver<T>,
}

impl<T> Future for Changed<'_, T> {
    type Output = Result<(), RecvError>;

    fn poll(self: Pin<&mut Self>, context: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        let receiver = &mut *this.receiver;

        if receiver.take_new_version() {
            return Poll::Ready(Ok(()));
        }
        if receiver.inner.is_sender_dropped() {
            return Poll::Ready(Err(RecvError));
        }

        let queued = match receiver.waiter.as_ref() {
            Some(w) => {
                // Woken without a new version: queue again.
                w.store(true, Ordering::Release);
                Arc::clone(w)
            }
            None => {
                let w = Arc::new(AtomicBool::new(true));
                receiver.waiter = Some(Arc::clone(&w));
                w
            }
        };
        receiver.inner.register_waker(WatchWaiter {
            waker: context.waker().clone(),
            queued,
        });

        // Re-check after registration so a concurrent publish is not missed.
        if receiver.take_new_version() {
            return Poll::Ready(Ok(()));
        }
        if receiver.inner.is_sender_dropped() {
            return Poll::Ready(Err(RecvError));
        }

        Poll::Pending
    }
}

/// Read guard over the value in a watch channel.
#[derive(Debug)]
pub struct Ref<'a, T> {
    guard: RwLockReadGuard<'a, (T, u64)>,
}

impl<T> std::ops::Deref for Ref<'_, T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.guard.0
    }
}
