use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};

use crate::domain::Priority;
use crate::metrics::SECONDS_PER_DAY;

pub const ATTENTION_DAYS_ALTA: i64 = 7;
pub const ATTENTION_DAYS_MEDIA: i64 = 15;
pub const ATTENTION_DAYS_BAJA: i64 = 30;
pub const ATTENTION_DAYS_FALLBACK: i64 = 15;
pub const CLOSURE_DAYS: i64 = 120;
/// Largest window accepted from configuration (about a century).
pub const MAX_WINDOW_DAYS: i64 = 36_500;

/// Attention and closure windows in whole days.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SlaPolicy {
    pub alta_days: i64,
    pub media_days: i64,
    pub baja_days: i64,
    /// Used when the priority is missing or outside the vocabulary.
    pub fallback_days: i64,
    pub closure_days: i64,
}

impl Default for SlaPolicy {
    fn default() -> Self {
        Self {
            alta_days: ATTENTION_DAYS_ALTA,
            media_days: ATTENTION_DAYS_MEDIA,
            baja_days: ATTENTION_DAYS_BAJA,
            fallback_days: ATTENTION_DAYS_FALLBACK,
            closure_days: CLOSURE_DAYS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadlines {
    /// Must be assigned by.
    pub attention: OffsetDateTime,
    /// Must be closed by.
    pub closure: OffsetDateTime,
}

impl SlaPolicy {
    pub fn attention_days(&self, priority: Option<Priority>) -> i64 {
        match priority {
            Some(Priority::Alta) => self.alta_days,
            Some(Priority::Media) => self.media_days,
            Some(Priority::Baja) => self.baja_days,
            None => self.fallback_days,
        }
    }

    /// `reported_at + N` whole days on the UTC timeline. No calendar or DST adjustment.
    ///
    /// Total: a deadline past the representable range saturates at the latest instant.
    pub fn deadlines(&self, priority: Option<Priority>, reported_at: OffsetDateTime) -> Deadlines {
        Deadlines {
            attention: add_days(reported_at, self.attention_days(priority)),
            closure: add_days(reported_at, self.closure_days),
        }
    }

    /// Same as [`SlaPolicy::deadlines`] for a stored priority string.
    pub fn deadlines_for_raw(&self, priority: &str, reported_at: OffsetDateTime) -> Deadlines {
        self.deadlines(Priority::parse(priority), reported_at)
    }
}

fn add_days(at: OffsetDateTime, days: i64) -> OffsetDateTime {
    at.saturating_add(Duration::seconds(days.saturating_mul(SECONDS_PER_DAY)))
}

/// Deadlines under the default policy.
pub fn compute_deadlines(priority: Option<Priority>, reported_at: OffsetDateTime) -> Deadlines {
    SlaPolicy::default().deadlines(priority, reported_at)
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn unknown_priority_uses_fallback_window() {
        let reported = datetime!(2026-01-10 12:00:00 UTC);
        let d = SlaPolicy::default().deadlines_for_raw("urgente", reported);
        assert_eq!(d.attention - reported, Duration::days(15));
        assert_eq!(d.closure - reported, Duration::days(120));
    }

    #[test]
    fn custom_policy_overrides_windows() {
        let policy = SlaPolicy {
            alta_days: 2,
            closure_days: 60,
            ..SlaPolicy::default()
        };
        let reported = datetime!(2026-01-10 00:00:00 UTC);
        let d = policy.deadlines(Some(Priority::Alta), reported);
        assert_eq!(d.attention, datetime!(2026-01-12 00:00:00 UTC));
        assert_eq!(d.closure, datetime!(2026-03-11 00:00:00 UTC));
    }

    #[test]
    fn oversized_window_saturates() {
        let policy = SlaPolicy {
            closure_days: i64::MAX,
            ..SlaPolicy::default()
        };
        let reported = datetime!(2026-01-10 00:00:00 UTC);
        let d = policy.deadlines(None, reported);
        assert_eq!(d.attention, datetime!(2026-01-25 00:00:00 UTC));
        assert_eq!(d.closure.year(), 9999);
        assert!(d.closure > reported);
    }
}
