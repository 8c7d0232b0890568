use time::macros::datetime;
use time::Duration;

use triage_core::analytics::{aggregate, AggregationWindow, DashboardInputs};
use triage_core::config::DashboardSettings;
use triage_core::domain::{Housing, Incident};
use triage_core::normalize::timestamps::format_rfc3339;
use triage_core::report::render_dashboard_markdown;

fn open_incident(id: i64, age_days: i64) -> Incident {
    let now = datetime!(2026-06-01 00:00:00 UTC);
    Incident {
        id,
        housing_id: 1,
        project_id: None,
        category: Some("plomería".to_string()),
        description: None,
        priority: Some("media".to_string()),
        status: Some("abierta".to_string()),
        reported_by: 2,
        assigned_technician_id: None,
        reported_at: format_rfc3339(now - Duration::days(age_days)).expect("format"),
        assigned_at: None,
        in_process_at: None,
        resolved_at: None,
        closed_at: None,
        attention_deadline: None,
        closure_deadline: None,
        origin: None,
        warranty: None,
    }
}

#[test]
fn markdown_lists_buckets_in_age_order_and_is_stable() {
    let incidents = vec![open_incident(1, 2), open_incident(2, 20), open_incident(3, 120)];
    let housings = vec![Housing {
        id: 1,
        project_id: Some(1),
        delivery_date: None,
        address: Some("Pasaje Aromo 101".to_string()),
    }];
    let window = AggregationWindow::new(180, datetime!(2026-06-01 00:00:00 UTC)).expect("window");
    let report = aggregate(
        &DashboardInputs {
            incidents: &incidents,
            housings: &housings,
            projects: &[],
            technicians: &[],
        },
        &window,
        &DashboardSettings::default(),
    );

    let md = render_dashboard_markdown(&report);
    assert_eq!(md, render_dashboard_markdown(&report));

    assert!(md.starts_with("# Incident Dashboard (last 180 days)\n"));
    assert!(md.contains("- Incidents: 3\n- Open: 3\n- Closed: 0\n"));
    assert!(md.contains("- Attention within deadline: UNKNOWN\n"));
    assert!(md.contains("| plomería | 3 |"));
    assert!(md.contains("| #1 | 3 | 1 | 3.0 |"));
    assert!(md.contains("| 1 | Pasaje Aromo 101 | 3 |"));
    assert!(md.contains("| (none) | 0 | 0 | 0 | UNKNOWN |"));

    let order = ["| 0-7d | 1 |", "| 8-14d | 0 |", "| 15-30d | 1 |", "| 61-90d | 0 |", "| 90d+ | 1 |"];
    let positions = order
        .iter()
        .map(|needle| md.find(needle).unwrap_or_else(|| panic!("missing {needle}")))
        .collect::<Vec<_>>();
    assert!(positions.windows(2).all(|w| w[0] < w[1]), "{positions:?}");
}
