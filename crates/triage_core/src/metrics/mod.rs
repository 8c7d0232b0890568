use time::OffsetDateTime;

use crate::domain::{Incident, ValidationWarning};
use crate::normalize::timestamps::parse_timestamp;

pub const SECONDS_PER_DAY: i64 = 86_400;

/// Per-incident facts derived at aggregation time.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct IncidentMetrics {
    /// Whole days since report, floored and clamped at zero. `None` if unparseable.
    pub age_days: Option<i64>,
    /// Close-or-resolve minus report. `None` when either side is missing, unparseable or
    /// the order is inverted.
    pub resolution_seconds: Option<i64>,
    /// Seconds between the close-or-resolve timestamp and `now`.
    pub settled_seconds_ago: Option<i64>,
    /// `None` without a usable attention deadline. Never-assigned incidents are `Some(false)`.
    pub attention_met: Option<bool>,
    /// `None` unless both a closure deadline and a close-or-resolve timestamp are usable.
    pub closure_met: Option<bool>,
}

fn parse_ts(
    field: &str,
    raw: Option<&str>,
    warnings: &mut Vec<ValidationWarning>,
) -> Option<OffsetDateTime> {
    let s = raw?;
    if s.trim().is_empty() {
        return None;
    }
    match parse_timestamp(s) {
        Some(dt) => Some(dt),
        None => {
            warnings.push(
                ValidationWarning::new(
                    "METRICS_TS_PARSE_FAILED",
                    format!("Failed to parse {field} for metrics"),
                )
                .with_details(format!("value={s}")),
            );
            None
        }
    }
}

fn diff_seconds(
    a_field: &str,
    a: Option<OffsetDateTime>,
    b_field: &str,
    b: Option<OffsetDateTime>,
    warnings: &mut Vec<ValidationWarning>,
) -> Option<i64> {
    let (Some(a), Some(b)) = (a, b) else {
        return None;
    };
    let secs = (b - a).whole_seconds();
    if secs < 0 {
        warnings.push(
            ValidationWarning::new(
                "METRICS_TS_ORDER_VIOLATION",
                format!("Cannot compute metric: {a_field} must be <= {b_field}"),
            )
            .with_details(format!("{a_field}={a}; {b_field}={b}")),
        );
        return None;
    }
    Some(secs)
}

/// Compute deterministic per-incident metrics relative to `now`.
///
/// Unparseable timestamps and ordering violations produce warnings and leave the affected
/// metric `None`; the rest of the incident still contributes.
pub fn compute_incident_metrics(
    incident: &Incident,
    now: OffsetDateTime,
) -> (IncidentMetrics, Vec<ValidationWarning>) {
    let mut warnings = Vec::new();

    let reported = parse_ts("reported_at", Some(&incident.reported_at), &mut warnings);
    let assigned = parse_ts("assigned_at", incident.assigned_at.as_deref(), &mut warnings);
    let settled_field = if incident.closed_at.is_some() {
        "closed_at"
    } else {
        "resolved_at"
    };
    let settled = parse_ts(settled_field, incident.settled_at(), &mut warnings);
    let attention_deadline = parse_ts(
        "attention_deadline",
        incident.attention_deadline.as_deref(),
        &mut warnings,
    );
    let closure_deadline = parse_ts(
        "closure_deadline",
        incident.closure_deadline.as_deref(),
        &mut warnings,
    );

    let age_days = reported.map(|r| ((now - r).whole_seconds().div_euclid(SECONDS_PER_DAY)).max(0));
    let resolution_seconds =
        diff_seconds("reported_at", reported, settled_field, settled, &mut warnings);
    let settled_seconds_ago = settled.map(|s| (now - s).whole_seconds());

    let attention_met = attention_deadline.map(|deadline| assigned.is_some_and(|a| a <= deadline));
    let closure_met = match (closure_deadline, settled) {
        (Some(deadline), Some(s)) => Some(s <= deadline),
        _ => None,
    };

    (
        IncidentMetrics {
            age_days,
            resolution_seconds,
            settled_seconds_ago,
            attention_met,
            closure_met,
        },
        warnings,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn incident() -> Incident {
        Incident {
            id: 7,
            housing_id: 1,
            project_id: None,
            category: None,
            description: None,
            priority: Some("alta".to_string()),
            status: Some("cerrada".to_string()),
            reported_by: 1,
            assigned_technician_id: Some(3),
            reported_at: "2026-01-01T00:00:00Z".to_string(),
            assigned_at: Some("2026-01-05T00:00:00Z".to_string()),
            in_process_at: None,
            resolved_at: Some("2026-01-10T12:00:00Z".to_string()),
            closed_at: None,
            attention_deadline: Some("2026-01-08T00:00:00Z".to_string()),
            closure_deadline: Some("2026-05-01T00:00:00Z".to_string()),
            origin: None,
            warranty: None,
        }
    }

    #[test]
    fn derives_durations_and_sla_outcomes() {
        let now = datetime!(2026-01-20 06:00:00 UTC);
        let (m, warnings) = compute_incident_metrics(&incident(), now);
        assert!(warnings.is_empty(), "unexpected warnings: {warnings:?}");
        assert_eq!(m.age_days, Some(19));
        assert_eq!(m.resolution_seconds, Some(9 * 86_400 + 12 * 3_600));
        assert_eq!(m.settled_seconds_ago, Some(9 * 86_400 + 18 * 3_600));
        assert_eq!(m.attention_met, Some(true));
        assert_eq!(m.closure_met, Some(true));
    }

    #[test]
    fn unassigned_incident_misses_attention() {
        let mut inc = incident();
        inc.assigned_at = None;
        let (m, _) = compute_incident_metrics(&inc, datetime!(2026-01-20 00:00:00 UTC));
        assert_eq!(m.attention_met, Some(false));
    }

    #[test]
    fn inverted_resolution_is_dropped_with_warning() {
        let mut inc = incident();
        inc.resolved_at = Some("2025-12-31T00:00:00Z".to_string());
        let (m, warnings) = compute_incident_metrics(&inc, datetime!(2026-01-20 00:00:00 UTC));
        assert_eq!(m.resolution_seconds, None);
        assert!(warnings
            .iter()
            .any(|w| w.code == "METRICS_TS_ORDER_VIOLATION"));
    }

    #[test]
    fn unparseable_report_only_affects_report_metrics() {
        let mut inc = incident();
        inc.reported_at = "hace una semana".to_string();
        let (m, warnings) = compute_incident_metrics(&inc, datetime!(2026-01-20 00:00:00 UTC));
        assert_eq!(m.age_days, None);
        assert_eq!(m.resolution_seconds, None);
        assert_eq!(m.closure_met, Some(true));
        assert_eq!(warnings[0].code, "METRICS_TS_PARSE_FAILED");
    }
}
