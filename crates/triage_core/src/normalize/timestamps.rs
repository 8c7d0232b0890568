use time::format_description::well_known::Rfc3339;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::{Date, OffsetDateTime, PrimitiveDateTime, Time, UtcOffset};

use crate::domain::ValidationWarning;
use crate::error::AppError;

const DATE_FORMAT: &[BorrowedFormatItem<'static>] = format_description!("[year]-[month]-[day]");

// Deterministic allowlist for timestamps stored without an offset. These are read as UTC.
const NAIVE_FORMATS: [&[BorrowedFormatItem<'static>]; 4] = [
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second]"),
    format_description!("[year]-[month]-[day] [hour]:[minute]"),
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]"),
    format_description!("[year]-[month]-[day]T[hour]:[minute]"),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedTimestamp {
    /// Canonical RFC3339 UTC string, if deterministically parseable.
    pub canonical_rfc3339_utc: Option<String>,
    /// Raw input preserved for non-RFC3339 (or unparseable) inputs.
    pub raw: Option<String>,
}

fn parse_naive(raw: &str) -> Option<OffsetDateTime> {
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| PrimitiveDateTime::parse(raw, fmt).ok())
        .map(PrimitiveDateTime::assume_utc)
}

/// Parse a stored timestamp: RFC3339 first, then the naive allowlist, then a bare date
/// (midnight UTC). Blank or anything else is `None`.
pub fn parse_timestamp(raw: &str) -> Option<OffsetDateTime> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(dt) = OffsetDateTime::parse(trimmed, &Rfc3339) {
        return Some(dt.to_offset(UtcOffset::UTC));
    }
    if let Some(dt) = parse_naive(trimmed) {
        return Some(dt);
    }
    Date::parse(trimmed, DATE_FORMAT)
        .ok()
        .map(|d| PrimitiveDateTime::new(d, Time::MIDNIGHT).assume_utc())
}

/// Calendar date of a stored value (`YYYY-MM-DD` or any timestamp `parse_timestamp` accepts).
pub fn parse_date(raw: &str) -> Option<Date> {
    let trimmed = raw.trim();
    Date::parse(trimmed, DATE_FORMAT)
        .ok()
        .or_else(|| parse_timestamp(trimmed).map(|dt| dt.date()))
}

pub fn format_rfc3339(dt: OffsetDateTime) -> Result<String, AppError> {
    dt.to_offset(UtcOffset::UTC).format(&Rfc3339).map_err(|e| {
        AppError::new("TS_FORMAT_FAILED", "Failed to format timestamp").with_details(e.to_string())
    })
}

pub fn format_date(date: Date) -> Result<String, AppError> {
    date.format(DATE_FORMAT).map_err(|e| {
        AppError::new("TS_FORMAT_FAILED", "Failed to format date").with_details(e.to_string())
    })
}

/// Normalize a user-provided timestamp into canonical RFC3339 UTC while preserving raw inputs.
///
/// Contract:
/// - RFC3339 input is stored canonical only (`raw=None`).
/// - Allowlisted input without an offset is stored canonical, keeps `raw`, and warns that UTC
///   was assumed.
/// - Unparseable input keeps `raw`, leaves canonical `None`, and warns.
pub fn normalize_timestamp(
    field: &str,
    raw_input: &str,
    warnings: &mut Vec<ValidationWarning>,
) -> NormalizedTimestamp {
    let trimmed = raw_input.trim();
    if trimmed.is_empty() {
        return NormalizedTimestamp {
            canonical_rfc3339_utc: None,
            raw: None,
        };
    }

    if let Ok(dt) = OffsetDateTime::parse(trimmed, &Rfc3339) {
        return NormalizedTimestamp {
            canonical_rfc3339_utc: format_rfc3339(dt).ok(),
            raw: None,
        };
    }

    let assumed = parse_naive(trimmed).or_else(|| {
        Date::parse(trimmed, DATE_FORMAT)
            .ok()
            .map(|d| PrimitiveDateTime::new(d, Time::MIDNIGHT).assume_utc())
    });
    if let Some(canon) = assumed.and_then(|dt| format_rfc3339(dt).ok()) {
        warnings.push(
            ValidationWarning::new(
                "TS_TZ_ASSUMED_UTC",
                format!("Assumed UTC timezone for {field}"),
            )
            .with_details(format!("raw={trimmed}; canonical={canon}")),
        );
        return NormalizedTimestamp {
            canonical_rfc3339_utc: Some(canon),
            raw: Some(trimmed.to_string()),
        };
    }

    warnings.push(
        ValidationWarning::new(
            "TS_UNPARSEABLE",
            format!("Unparseable timestamp for {field}; preserved raw"),
        )
        .with_details(format!("raw={trimmed}")),
    );

    NormalizedTimestamp {
        canonical_rfc3339_utc: None,
        raw: Some(trimmed.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::{date, datetime};

    #[test]
    fn parses_rfc3339_with_offset_into_utc() {
        let dt = parse_timestamp("2026-03-01T10:00:00-03:00").expect("parse");
        assert_eq!(dt, datetime!(2026-03-01 13:00:00 UTC));
    }

    #[test]
    fn naive_and_date_only_inputs_are_utc() {
        assert_eq!(
            parse_timestamp("2026-03-01 08:30:00"),
            Some(datetime!(2026-03-01 08:30:00 UTC))
        );
        assert_eq!(
            parse_timestamp("2026-03-01"),
            Some(datetime!(2026-03-01 00:00:00 UTC))
        );
        assert_eq!(parse_timestamp("   "), None);
        assert_eq!(parse_timestamp("ayer"), None);
    }

    #[test]
    fn parse_date_accepts_both_shapes() {
        assert_eq!(parse_date("2020-02-29"), Some(date!(2020 - 02 - 29)));
        assert_eq!(
            parse_date("2020-02-29T23:00:00Z"),
            Some(date!(2020 - 02 - 29))
        );
        assert_eq!(parse_date("29/02/2020"), None);
    }

    #[test]
    fn normalize_warns_when_assuming_utc() {
        let mut warnings = Vec::new();
        let n = normalize_timestamp("reported_at", "2026-03-01 08:30", &mut warnings);
        assert_eq!(
            n.canonical_rfc3339_utc.as_deref(),
            Some("2026-03-01T08:30:00Z")
        );
        assert_eq!(n.raw.as_deref(), Some("2026-03-01 08:30"));
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].code, "TS_TZ_ASSUMED_UTC");

        let mut warnings = Vec::new();
        let n = normalize_timestamp("reported_at", "not a date", &mut warnings);
        assert_eq!(n.canonical_rfc3339_utc, None);
        assert_eq!(warnings[0].code, "TS_UNPARSEABLE");
    }
}
