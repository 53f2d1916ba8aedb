use std::fmt;

/// Error indicating that an admission attempt was cancelled while
/// waiting for capacity.
///
/// The aborted attempt leaves no trace in the limiter: no receipt was
/// recorded, and no credit needs to be returned. The engine never
/// retries on the caller's behalf.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cancelled;

impl fmt::Display for Cancelled {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "admission attempt cancelled while waiting for capacity")
    }
}

impl std::error::Error for Cancelled {}

/// Error indicating that a quota was configured with a zero period.
///
/// Reported at construction time, never at request time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidQuota;

impl fmt::Display for InvalidQuota {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "quota period must be non-zero")
    }
}

impl std::error::Error for InvalidQuota {}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn coverage() {
        let display_output = format!("{}", Cancelled);
        assert!(display_output.contains("cancelled"));
        let display_output = format!("{}", InvalidQuota);
        assert!(display_output.contains("non-zero"));
        assert_eq!(Cancelled, Cancelled);
        assert_eq!(InvalidQuota, InvalidQuota);
    }
}
