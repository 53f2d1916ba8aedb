//! The process-wide mapping from routing key to shared limiter.

use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use tracing::debug;

use crate::clock::{Clock, DefaultClock};
use crate::window::SlidingWindow;
use crate::Quota;

/// A lazily-populated map from routing key (destination host) to its
/// shared [`SlidingWindow`].
///
/// Exactly one limiter exists per distinct key for the registry's
/// lifetime, even under concurrent first access; every client routing
/// to the same host draws from the same budget regardless of which
/// transport issued the request. Entries are never removed.
///
/// Construct one registry at application startup and hand an
/// `Arc<LimiterRegistry>` to every admission-controlled client. There
/// is deliberately no global instance: tests (and embedders running
/// several independent scraping pipelines) each build their own.
///
/// # First quota wins
///
/// A key's limiter is parameterized by whichever quota first causes its
/// creation. A later [`get`][`LimiterRegistry::get`] for the same key
/// with a *different* quota silently reuses the existing limiter,
/// parameters and all.
pub struct LimiterRegistry<C: Clock = DefaultClock> {
    clock: C,
    limiters: DashMap<String, Arc<SlidingWindow<C>>>,
}

impl LimiterRegistry<DefaultClock> {
    /// Constructs an empty registry against the monotonic clock.
    pub fn new() -> Self {
        Self::with_clock(DefaultClock::default())
    }
}

impl Default for LimiterRegistry<DefaultClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> LimiterRegistry<C> {
    /// Constructs an empty registry whose limiters measure against a
    /// custom clock.
    pub fn with_clock(clock: C) -> Self {
        LimiterRegistry {
            clock,
            limiters: DashMap::new(),
        }
    }

    /// Returns the unique limiter for `key`, creating it with `quota`
    /// on first demand.
    ///
    /// Get-or-create is atomic: two threads racing on a fresh key both
    /// observe the same instance.
    pub fn get(&self, key: &str, quota: Quota) -> Arc<SlidingWindow<C>> {
        if let Some(limiter) = self.limiters.get(key) {
            // fast path: the key has been seen before
            return Arc::clone(&limiter);
        }
        let entry = self.limiters.entry(key.to_owned()).or_insert_with(|| {
            debug!(
                key,
                permits = quota.permits().get(),
                period = ?quota.period(),
                "creating shared limiter"
            );
            Arc::new(SlidingWindow::with_clock(quota, self.clock.clone()))
        });
        Arc::clone(&entry)
    }

    /// The number of distinct keys seen so far.
    pub fn len(&self) -> usize {
        self.limiters.len()
    }

    /// Whether no key has been seen yet.
    pub fn is_empty(&self) -> bool {
        self.limiters.is_empty()
    }
}

impl<C: Clock> fmt::Debug for LimiterRegistry<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LimiterRegistry")
            .field("keys", &self.len())
            .finish()
    }
}
