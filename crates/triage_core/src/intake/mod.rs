//! Creation-time pipeline: priority, then deadlines, then warranty facts for post-sale items.

use time::{Date, OffsetDateTime};
use tracing::debug;

use crate::classify::classify_with_rule;
use crate::domain::{
    Incident, IncidentOrigin, IncidentStatus, Priority, WarrantyClass, WarrantyFacts,
};
use crate::error::AppError;
use crate::normalize::timestamps::{format_date, format_rfc3339};
use crate::sla::{Deadlines, SlaPolicy};
use crate::warranty::{warranty_class_for, WarrantyResolver};

pub const WARRANTY_SOURCE_POSTSALE: &str = "posventa";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewIncidentReport {
    pub housing_id: i64,
    pub project_id: Option<i64>,
    pub category: String,
    pub description: String,
    pub reported_by: i64,
    pub origin: IncidentOrigin,
    pub reported_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WarrantyAssessment {
    pub class: Option<WarrantyClass>,
    pub expires_on: Option<Date>,
    pub valid_now: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriagedIncident {
    pub report: NewIncidentReport,
    pub priority: Priority,
    /// Name of the classifier rule that decided the priority.
    pub rule: &'static str,
    pub deadlines: Deadlines,
    /// Present only for post-sale inspection items.
    pub warranty: Option<WarrantyAssessment>,
}

/// Run the creation-time computations for a new report.
///
/// `delivery_date` is the housing unit's delivery date and `today` anchors the warranty
/// validity check; both only matter for post-sale items.
pub fn triage_report(
    report: NewIncidentReport,
    delivery_date: Option<Date>,
    sla: &SlaPolicy,
    warranty: &WarrantyResolver,
    today: Date,
) -> TriagedIncident {
    let (priority, rule) = classify_with_rule(&report.category, &report.description);
    let deadlines = sla.deadlines(Some(priority), report.reported_at);

    let warranty = (report.origin == IncidentOrigin::Posventa).then(|| {
        let class = warranty_class_for(&report.category);
        WarrantyAssessment {
            class,
            expires_on: warranty.compute_expiry(delivery_date, class),
            valid_now: warranty.is_currently_valid(delivery_date, class, today),
        }
    });

    debug!(
        housing_id = report.housing_id,
        priority = priority.as_str(),
        rule,
        "triaged new incident report"
    );

    TriagedIncident {
        report,
        priority,
        rule,
        deadlines,
        warranty,
    }
}

impl TriagedIncident {
    /// Storage row for a freshly created incident with status `abierta`.
    pub fn into_incident(self, id: i64) -> Result<Incident, AppError> {
        let warranty = match self.warranty {
            Some(w) => Some(WarrantyFacts {
                class: w.class,
                expires_on: w.expires_on.map(format_date).transpose()?,
                valid_now: w.valid_now,
                source: Some(WARRANTY_SOURCE_POSTSALE.to_string()),
            }),
            None => None,
        };
        let blank_to_none = |s: String| {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        };

        Ok(Incident {
            id,
            housing_id: self.report.housing_id,
            project_id: self.report.project_id,
            category: blank_to_none(self.report.category),
            description: blank_to_none(self.report.description),
            priority: Some(self.priority.as_str().to_string()),
            status: Some(IncidentStatus::Abierta.as_str().to_string()),
            reported_by: self.report.reported_by,
            assigned_technician_id: None,
            reported_at: format_rfc3339(self.report.reported_at)?,
            assigned_at: None,
            in_process_at: None,
            resolved_at: None,
            closed_at: None,
            attention_deadline: Some(format_rfc3339(self.deadlines.attention)?),
            closure_deadline: Some(format_rfc3339(self.deadlines.closure)?),
            origin: Some(self.report.origin),
            warranty,
        })
    }
}
