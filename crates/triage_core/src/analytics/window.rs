use time::{Duration, OffsetDateTime};

use crate::error::AppError;

/// Trailing report-date window a dashboard is computed over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AggregationWindow {
    days: u32,
    now: OffsetDateTime,
    since: OffsetDateTime,
}

impl AggregationWindow {
    pub fn new(days: u32, now: OffsetDateTime) -> Result<Self, AppError> {
        if days == 0 {
            return Err(AppError::new(
                "WINDOW_INVALID_DAYS",
                "Aggregation window must cover at least 1 day",
            ));
        }
        Ok(Self {
            days,
            now,
            since: now - Duration::days(i64::from(days)),
        })
    }

    pub fn ending_now(days: u32) -> Result<Self, AppError> {
        Self::new(days, OffsetDateTime::now_utc())
    }

    pub fn days(&self) -> u32 {
        self.days
    }

    pub fn now(&self) -> OffsetDateTime {
        self.now
    }

    pub fn since(&self) -> OffsetDateTime {
        self.since
    }

    pub fn contains(&self, reported_at: OffsetDateTime) -> bool {
        reported_at >= self.since
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn zero_days_is_rejected() {
        let err = AggregationWindow::new(0, datetime!(2026-01-01 00:00:00 UTC)).unwrap_err();
        assert_eq!(err.code, "WINDOW_INVALID_DAYS");
    }

    #[test]
    fn since_is_now_minus_days() {
        let w = AggregationWindow::new(90, datetime!(2026-04-01 00:00:00 UTC)).expect("window");
        assert_eq!(w.since(), datetime!(2026-01-01 00:00:00 UTC));
        assert!(w.contains(datetime!(2026-01-01 00:00:00 UTC)));
        assert!(!w.contains(datetime!(2025-12-31 23:59:59 UTC)));
    }
}
