//! Sliding-window limiters: the per-key admission controllers.

use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::{Condvar, Mutex};
use tracing::trace;

use crate::cancel::{CancelToken, Wake};
use crate::clock::{Clock, DefaultClock, Reference};
use crate::errors::Cancelled;
use crate::gate::FairGate;
use crate::nanos::Nanos;
use crate::Quota;

/// Proof of one admission, returned by a successful acquire.
///
/// A receipt is a value, not a guard: dropping it changes nothing. Its
/// only use is to hand the admission back to
/// [`SlidingWindow::release`] when the request it covered turned out
/// not to consume network capacity (e.g. it was answered from a local
/// response cache).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Receipt(pub(crate) Nanos);

/// A negative, non-blocking admission outcome.
///
/// Returned by [`SlidingWindow::try_acquire`] when admitting
/// immediately would either exceed the window's capacity or overtake
/// threads already queued for admission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Throttled {
    wait: Duration,
}

impl Throttled {
    /// A hint at how long to wait before the next attempt could
    /// conform. Zero when the limiter was merely contended rather than
    /// out of capacity.
    pub fn wait_time(&self) -> Duration {
        self.wait
    }
}

impl fmt::Display for Throttled {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "throttled; earliest admission in {:?}", self.wait)
    }
}

impl std::error::Error for Throttled {}

#[derive(Debug, Default)]
struct WindowState {
    gate: FairGate,
    receipts: VecDeque<Nanos>,
}

#[derive(Default)]
struct Shared {
    state: Mutex<WindowState>,
    cond: Condvar,
}

impl Wake for Shared {
    fn wake(&self) {
        // Taking the lock orders this notification after any sleeper's
        // cancellation check, so the wakeup can not be lost.
        let _state = self.state.lock();
        self.cond.notify_all();
    }
}

/// A sliding-window admission controller.
///
/// At any rolling instant, at most `permits` admissions fall within the
/// trailing `period`; there is no window boundary at which a fresh
/// budget appears, so the true admission rate is bounded at every
/// instant (which is what destination servers actually rate-limit on).
///
/// [`acquire`][`SlidingWindow::acquire`] blocks the calling thread
/// until admission is safe, servicing callers in strict arrival order.
/// [`release`][`SlidingWindow::release`] returns an unused admission,
/// freeing a slot sooner than the window would naturally vacate it.
///
/// Limiters are usually obtained from a
/// [`LimiterRegistry`][`crate::LimiterRegistry`] so that every client
/// targeting the same host shares one instance, but nothing stops
/// direct construction:
///
/// ```rust
/// # use turnstile::{SlidingWindow, Quota, CancelToken};
/// # use nonzero_ext::nonzero;
/// let window = SlidingWindow::new(Quota::per_second(nonzero!(5u32)));
/// let receipt = window.acquire(&CancelToken::new()).unwrap();
/// // ... request turns out to be a cache hit:
/// window.release(receipt);
/// ```
pub struct SlidingWindow<C: Clock = DefaultClock> {
    quota: Quota,
    period: Nanos,
    start: C::Instant,
    clock: C,
    shared: Arc<Shared>,
}

impl SlidingWindow<DefaultClock> {
    /// Constructs a limiter for a quota against the monotonic clock.
    pub fn new(quota: Quota) -> Self {
        Self::with_clock(quota, DefaultClock::default())
    }
}

impl<C: Clock> SlidingWindow<C> {
    /// Constructs a limiter for a quota against a custom clock.
    pub fn with_clock(quota: Quota, clock: C) -> Self {
        let start = clock.now();
        SlidingWindow {
            quota,
            period: quota.period().into(),
            start,
            clock,
            shared: Arc::default(),
        }
    }

    /// The quota this limiter enforces.
    pub fn quota(&self) -> Quota {
        self.quota
    }

    /// The number of receipts currently recorded, counting ones whose
    /// window has elapsed but that no admission attempt has evicted
    /// yet. Never exceeds the quota's permits.
    pub fn outstanding(&self) -> usize {
        self.shared.state.lock().receipts.len()
    }

    fn now(&self) -> Nanos {
        self.clock.now().duration_since(self.start)
    }

    /// Blocks the calling thread until admission is safe, then records
    /// the admission and returns its receipt.
    ///
    /// Callers are admitted in the exact order they called `acquire`,
    /// even when the window stays full across multiple expiries. The
    /// wait is unbounded unless `token` fires, in which case the
    /// attempt aborts with [`Cancelled`] and leaves no receipt behind.
    pub fn acquire(&self, token: &CancelToken) -> Result<Receipt, Cancelled> {
        let waker = Arc::clone(&self.shared) as Arc<dyn Wake>;
        let _sub = token.subscribe(Arc::downgrade(&waker));
        let mut state = self.shared.state.lock();
        let ticket = state.gate.ticket();

        // Wait for the head of the line.
        while !state.gate.is_turn(ticket) {
            if token.is_cancelled() {
                state.gate.retire(ticket);
                self.shared.cond.notify_all();
                return Err(Cancelled);
            }
            self.shared.cond.wait(&mut state);
        }

        let result = loop {
            if token.is_cancelled() {
                break Err(Cancelled);
            }
            let now = self.now();
            if state.receipts.len() < self.quota.permits().get() as usize {
                state.receipts.push_back(now);
                break Ok(Receipt(now));
            }
            // Full. Evict receipts that have aged out of the window;
            // they are oldest-first, so eviction only touches the front.
            let before = state.receipts.len();
            while state.receipts.front().is_some_and(|&t| t + self.period <= now) {
                state.receipts.pop_front();
            }
            if state.receipts.len() < before {
                continue;
            }
            // Every receipt is recent: sleep until the oldest one is
            // due to expire, or until a release frees a slot early.
            let oldest = *state
                .receipts
                .front()
                .expect("a full window holds at least one receipt");
            let wait: Duration = (oldest + self.period).saturating_sub(now).into();
            trace!(?wait, "window full; parking until a slot frees");
            let _ = self.shared.cond.wait_for(&mut state, wait);
        };

        state.gate.retire(ticket);
        self.shared.cond.notify_all();
        result
    }

    /// Attempts a single admission without blocking.
    ///
    /// Fails with [`Throttled`] if the window is at capacity or if
    /// other callers are already queued for admission - a conforming
    /// non-blocking attempt must not overtake them.
    pub fn try_acquire(&self) -> Result<Receipt, Throttled> {
        let mut state = self.shared.state.lock();
        if !state.gate.idle() {
            return Err(Throttled {
                wait: Duration::ZERO,
            });
        }
        let now = self.now();
        while state.receipts.front().is_some_and(|&t| t + self.period <= now) {
            state.receipts.pop_front();
        }
        if state.receipts.len() < self.quota.permits().get() as usize {
            state.receipts.push_back(now);
            Ok(Receipt(now))
        } else {
            let oldest = *state
                .receipts
                .front()
                .expect("a full window holds at least one receipt");
            Err(Throttled {
                wait: (oldest + self.period).saturating_sub(now).into(),
            })
        }
    }

    /// Returns an unused admission, freeing its slot for a new acquire
    /// sooner than the window would naturally vacate it.
    ///
    /// A receipt that has already been evicted (or released) is a
    /// no-op; at most one queue entry is ever removed, so concurrent
    /// acquire/release traffic can not disturb other admissions.
    pub fn release(&self, receipt: Receipt) {
        let mut state = self.shared.state.lock();
        let head = match state.receipts.front() {
            Some(&head) => head,
            None => return,
        };
        if receipt.0 < head {
            // Aged out of the window and evicted some time ago.
            return;
        }
        if let Some(idx) = state.receipts.iter().position(|&t| t == receipt.0) {
            state.receipts.remove(idx);
            trace!("returned unused admission credit");
            self.shared.cond.notify_all();
        }
    }
}

impl<C: Clock> fmt::Debug for SlidingWindow<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SlidingWindow")
            .field("quota", &self.quota)
            .field("outstanding", &self.outstanding())
            .finish()
    }
}
