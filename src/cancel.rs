//! Cooperative cancellation for blocking admission waits.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

/// Something that can be prodded awake when a token fires.
///
/// Implementations must take the lock that their sleepers wait under
/// before notifying, so that a token firing between a sleeper's last
/// cancellation check and its wait can not be lost.
pub(crate) trait Wake: Send + Sync {
    fn wake(&self);
}

/// A cancellation flag tied to one logical operation, e.g. a single
/// outgoing HTTP request.
///
/// Cancellation is sticky: once [`cancel`][`CancelToken::cancel`] has
/// been called, every current and future admission attempt made with
/// this token fails with [`Cancelled`][`crate::Cancelled`]. Clones
/// share the flag, so a token can be handed to the thread performing
/// the request while the initiating side retains the ability to abort
/// it.
#[derive(Clone, Default)]
pub struct CancelToken {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    cancelled: AtomicBool,
    waiters: Mutex<Vec<Weak<dyn Wake>>>,
}

impl CancelToken {
    /// Creates a token in the un-cancelled state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fires the token, waking every admission attempt currently
    /// blocked on it.
    ///
    /// Idempotent; cancelling an already-cancelled token has no effect.
    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::SeqCst);
        let mut waiters = self.inner.waiters.lock();
        waiters.retain(|w| match w.upgrade() {
            Some(waiter) => {
                waiter.wake();
                true
            }
            None => false,
        });
    }

    /// Whether the token has fired.
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Registers a waiter to be woken by [`cancel`][`CancelToken::cancel`].
    /// Dropping the returned subscription deregisters it.
    pub(crate) fn subscribe(&self, waiter: Weak<dyn Wake>) -> Subscription<'_> {
        self.inner.waiters.lock().push(Weak::clone(&waiter));
        Subscription {
            token: self,
            waiter,
        }
    }
}

impl fmt::Debug for CancelToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancelToken")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

pub(crate) struct Subscription<'t> {
    token: &'t CancelToken,
    waiter: Weak<dyn Wake>,
}

impl Drop for Subscription<'_> {
    fn drop(&mut self) {
        let mut waiters = self.token.inner.waiters.lock();
        if let Some(idx) = waiters.iter().position(|w| Weak::ptr_eq(w, &self.waiter)) {
            waiters.swap_remove(idx);
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[derive(Default)]
    struct Flag(AtomicBool);

    impl Wake for Flag {
        fn wake(&self) {
            self.0.store(true, Ordering::SeqCst);
        }
    }

    #[test]
    fn starts_untriggered() {
        let token = CancelToken::new();
        assert!(!token.is_cancelled());
        token.cancel();
        assert!(token.is_cancelled());
        assert!(token.clone().is_cancelled());
    }

    #[test]
    fn wakes_subscribed_waiters() {
        let token = CancelToken::new();
        let flag: Arc<Flag> = Arc::default();
        let _sub = token.subscribe(Arc::downgrade(&flag) as Weak<dyn Wake>);
        token.cancel();
        assert!(flag.0.load(Ordering::SeqCst));
    }

    #[test]
    fn dropped_subscription_is_not_woken() {
        let token = CancelToken::new();
        let flag: Arc<Flag> = Arc::default();
        drop(token.subscribe(Arc::downgrade(&flag) as Weak<dyn Wake>));
        token.cancel();
        assert!(!flag.0.load(Ordering::SeqCst));
    }
}
