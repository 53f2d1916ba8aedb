use std::convert::TryInto;
use std::fmt;
use std::ops::Add;
use std::time::Duration;

/// A number of nanoseconds from a reference point.
///
/// Can not represent durations >584 years, but hopefully that
/// should not be a problem in real-world applications.
#[derive(PartialEq, Eq, Default, Clone, Copy, PartialOrd, Ord, Hash)]
pub struct Nanos(u64);

impl Nanos {
    /// The number of nanoseconds from the reference point.
    pub fn as_u64(self) -> u64 {
        self.0
    }

    pub(crate) fn saturating_sub(self, rhs: Nanos) -> Nanos {
        Nanos(self.0.saturating_sub(rhs.0))
    }
}

impl From<Duration> for Nanos {
    fn from(d: Duration) -> Self {
        // This will panic:
        Nanos(
            d.as_nanos()
                .try_into()
                .expect("Duration is longer than 584 years"),
        )
    }
}

impl From<u64> for Nanos {
    fn from(n: u64) -> Self {
        Nanos(n)
    }
}

impl From<Nanos> for u64 {
    fn from(n: Nanos) -> Self {
        n.0
    }
}

impl From<Nanos> for Duration {
    fn from(n: Nanos) -> Self {
        Duration::from_nanos(n.0)
    }
}

impl Add<Nanos> for Nanos {
    type Output = Nanos;

    fn add(self, rhs: Nanos) -> Nanos {
        Nanos(self.0 + rhs.0)
    }
}

impl fmt::Debug for Nanos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let d = Duration::from_nanos(self.0);
        write!(f, "Nanos({:?})", d)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn nanos_impls() {
        let n = Nanos::from(20u64);
        assert_eq!("Nanos(20ns)", format!("{:?}", n));
        assert_eq!(Nanos::from(30u64), n + Nanos::from(10u64));
    }

    #[test]
    fn nanos_saturating_sub() {
        let n = Nanos::from(Duration::from_secs(1));
        assert_eq!(Nanos::from(0u64), Nanos::from(0u64).saturating_sub(n));
        assert_eq!(n, (n + n).saturating_sub(n));
    }

    #[test]
    fn duration_roundtrip() {
        let d = Duration::from_millis(2500);
        let n = Nanos::from(d);
        assert_eq!(d, Duration::from(n));
    }
}
