use time::OffsetDateTime;

use crate::domain::{Incident, IncidentStatus};
use crate::error::AppError;
use crate::normalize::timestamps::{format_rfc3339, parse_timestamp};

fn rank(status: IncidentStatus) -> u8 {
    match status {
        IncidentStatus::Abierta => 0,
        IncidentStatus::EnProceso | IncidentStatus::EnEspera => 1,
        IncidentStatus::Resuelta => 2,
        IncidentStatus::Cerrada | IncidentStatus::Descartada => 3,
    }
}

/// abierta → en_proceso ⇄ en_espera → resuelta → cerrada, with descartada reachable from
/// any state before resolution. Cerrada and descartada are terminal.
pub fn is_allowed(from: IncidentStatus, to: IncidentStatus) -> bool {
    use crate::domain::IncidentStatus::*;
    match (from, to) {
        (Cerrada | Descartada, _) => false,
        (EnProceso, EnEspera) | (EnEspera, EnProceso) => true,
        (Resuelta, Descartada) => false,
        (Abierta, Resuelta | Cerrada) => false,
        _ => rank(to) > rank(from),
    }
}

fn current_status(incident: &Incident) -> Result<IncidentStatus, AppError> {
    match incident.status.as_deref() {
        None => Ok(IncidentStatus::Abierta),
        Some(raw) => IncidentStatus::parse(raw).ok_or_else(|| {
            AppError::new(
                "LIFECYCLE_UNKNOWN_STATUS",
                "Incident has a status outside the lifecycle vocabulary",
            )
            .with_details(format!("id={}; status={raw}", incident.id))
        }),
    }
}

/// Move `incident` to `to`, stamping the timestamp that goes with the new state.
///
/// Closing back-fills `resolved_at` when it is missing, so a closed incident always has
/// `resolved_at <= closed_at`.
pub fn transition(
    incident: &mut Incident,
    to: IncidentStatus,
    at: OffsetDateTime,
) -> Result<(), AppError> {
    let from = current_status(incident)?;
    if !is_allowed(from, to) {
        return Err(AppError::new(
            "LIFECYCLE_INVALID_TRANSITION",
            format!("Cannot move incident from {} to {}", from.as_str(), to.as_str()),
        )
        .with_details(format!("id={}", incident.id)));
    }

    let stamp = format_rfc3339(at)?;
    match to {
        IncidentStatus::EnProceso => {
            if incident.in_process_at.is_none() {
                incident.in_process_at = Some(stamp);
            }
        }
        IncidentStatus::Resuelta => {
            incident.resolved_at = Some(stamp);
        }
        IncidentStatus::Cerrada => {
            let resolved_ok = incident
                .resolved_at
                .as_deref()
                .and_then(parse_timestamp)
                .is_some_and(|r| r <= at);
            if !resolved_ok {
                incident.resolved_at = Some(stamp.clone());
            }
            incident.closed_at = Some(stamp);
        }
        IncidentStatus::Abierta | IncidentStatus::EnEspera | IncidentStatus::Descartada => {}
    }
    incident.status = Some(to.as_str().to_string());
    Ok(())
}

/// Assign a technician. The first assignment time is kept for attention-SLA purposes; an
/// `abierta` incident moves to `en_proceso`.
pub fn assign(
    incident: &mut Incident,
    technician_id: i64,
    at: OffsetDateTime,
) -> Result<(), AppError> {
    let from = current_status(incident)?;
    if matches!(from, IncidentStatus::Cerrada | IncidentStatus::Descartada) {
        return Err(AppError::new(
            "LIFECYCLE_INVALID_TRANSITION",
            format!("Cannot assign a {} incident", from.as_str()),
        )
        .with_details(format!("id={}", incident.id)));
    }
    incident.assigned_technician_id = Some(technician_id);
    if incident.assigned_at.is_none() {
        incident.assigned_at = Some(format_rfc3339(at)?);
    }
    if from == IncidentStatus::Abierta {
        transition(incident, IncidentStatus::EnProceso, at)?;
    }
    Ok(())
}
