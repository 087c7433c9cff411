// Suppress replays of old responses.
//
// A snapshot subscription first delivers everything already stored. Responses
// stamped well before this process started belong to an earlier run and should
// not light up the overlay.

use chrono::{DateTime, Duration, Utc};

/// Largest grace the config accepts (about 100 years).
pub const MAX_GRACE_SECS: u64 = 100 * 365 * 24 * 60 * 60;

/// `secs` as a chrono duration, or None if chrono cannot represent it.
pub fn grace_from_secs(secs: u64) -> Option<Duration> {
    i64::try_from(secs).ok().and_then(Duration::try_seconds)
}

#[derive(Clone, Copy, Debug)]
pub struct StaleFilter {
    started_at: DateTime<Utc>,
    grace: Option<Duration>,
}

impl StaleFilter {
    /// `grace` of None or zero disables the filter.
    pub fn new(started_at: DateTime<Utc>, grace: Option<Duration>) -> Self {
        let grace = grace.filter(|g| *g > Duration::zero());
        Self { started_at, grace }
    }

    pub fn from_grace_secs(started_at: DateTime<Utc>, grace_secs: Option<u64>) -> Self {
        let grace = grace_secs.map(|s| {
            grace_from_secs(s).unwrap_or_else(|| {
                log::warn!("Stale grace of {s}s is out of range, no response will count as stale");
                Duration::MAX
            })
        });
        Self::new(started_at, grace)
    }

    pub fn enabled(&self) -> bool {
        self.grace.is_some()
    }

    /// True when `timestamp` predates `started_at - grace`. A cutoff before
    /// the earliest representable time means nothing is stale.
    pub fn is_stale(&self, timestamp: DateTime<Utc>) -> bool {
        let Some(grace) = self.grace else { return false };
        match self.started_at.checked_sub_signed(grace) {
            Some(cutoff) => timestamp < cutoff,
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn start() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2025-09-19T09:51:17Z").unwrap().with_timezone(&Utc)
    }

    #[test]
    fn old_response_discarded_with_grace() {
        let f = StaleFilter::from_grace_secs(start(), Some(10));
        assert!(f.is_stale(start() - Duration::seconds(100)));
    }

    #[test]
    fn old_response_retained_without_grace() {
        for grace in [None, Some(0)] {
            let f = StaleFilter::from_grace_secs(start(), grace);
            assert!(!f.enabled());
            assert!(!f.is_stale(start() - Duration::seconds(100)));
        }
    }

    #[test]
    fn responses_inside_grace_window_are_kept() {
        let f = StaleFilter::from_grace_secs(start(), Some(10));
        assert!(!f.is_stale(start() - Duration::seconds(10)));
        assert!(!f.is_stale(start() - Duration::seconds(3)));
        assert!(!f.is_stale(start() + Duration::seconds(30)));
        assert!(f.is_stale(start() - Duration::milliseconds(10_001)));
    }

    #[test]
    fn huge_grace_keeps_everything() {
        for secs in [10_000_000_000_000, u64::MAX] {
            let f = StaleFilter::from_grace_secs(start(), Some(secs));
            assert!(f.enabled());
            assert!(!f.is_stale(start()));
            assert!(!f.is_stale(DateTime::<Utc>::MIN_UTC));
        }
    }

    #[test]
    fn grace_conversion_limits() {
        assert_eq!(grace_from_secs(10), Some(Duration::seconds(10)));
        assert!(grace_from_secs(MAX_GRACE_SECS).is_some());
        assert_eq!(grace_from_secs(u64::MAX), None);
    }
}
