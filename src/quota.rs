use std::num::NonZeroU32;
use std::time::Duration;

use crate::errors::InvalidQuota;

/// A rate-limiting quota: a number of admissions over a rolling window.
///
/// Quotas are expressed as a positive number of `permits` (the maximum
/// number of admissions a limiter allows at any rolling instant) and the
/// `period` over which those permits are counted. A limiter governed by
/// `Quota::new(nonzero!(5u32), Duration::from_secs(1))` admits at most 5
/// requests within *any* one-second span, not 5 per calendar second -
/// there is no window boundary at which the budget doubles.
///
/// Neither the number of permits nor the period may be zero; zero permits
/// are unrepresentable by type, and a zero period is rejected at
/// construction time.
///
/// # Examples
///
/// ```rust
/// # use turnstile::Quota;
/// # use nonzero_ext::nonzero;
/// # use std::time::Duration;
/// let q = Quota::per_second(nonzero!(5u32));
/// assert_eq!(q, Quota::new(nonzero!(5u32), Duration::from_secs(1)).unwrap());
/// assert_eq!(q.permits().get(), 5);
/// assert_eq!(q.period(), Duration::from_secs(1));
///
/// // A zero period is a configuration error, reported up front:
/// assert!(Quota::new(nonzero!(5u32), Duration::ZERO).is_err());
/// ```
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub struct Quota {
    pub(crate) permits: NonZeroU32,
    pub(crate) period: Duration,
}

/// Constructors for quotas
impl Quota {
    /// Construct a quota for a number of permits per rolling second.
    pub const fn per_second(permits: NonZeroU32) -> Quota {
        Quota {
            permits,
            period: Duration::from_secs(1),
        }
    }

    /// Construct a quota for a number of permits per rolling 60-second window.
    pub const fn per_minute(permits: NonZeroU32) -> Quota {
        Quota {
            permits,
            period: Duration::from_secs(60),
        }
    }

    /// Construct a quota for a number of permits over an arbitrary window.
    ///
    /// Returns [`InvalidQuota`] if the period is zero.
    pub fn new(permits: NonZeroU32, period: Duration) -> Result<Quota, InvalidQuota> {
        if period.as_nanos() == 0 {
            Err(InvalidQuota)
        } else {
            Ok(Quota { permits, period })
        }
    }
}

/// Retrieving information about a quota
impl Quota {
    /// The maximum number of admissions allowed within one window.
    pub const fn permits(&self) -> NonZeroU32 {
        self.permits
    }

    /// The rolling duration over which [`permits`][`Quota::permits`] is measured.
    pub const fn period(&self) -> Duration {
        self.period
    }
}
