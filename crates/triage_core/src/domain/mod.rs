use serde::{Deserialize, Serialize};

/// Severity tier assigned at intake. Drives the attention window.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Alta,
    Media,
    Baja,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Alta => "alta",
            Priority::Media => "media",
            Priority::Baja => "baja",
        }
    }

    /// Case-insensitive parse; anything outside the vocabulary is `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "alta" => Some(Priority::Alta),
            "media" => Some(Priority::Media),
            "baja" => Some(Priority::Baja),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum IncidentStatus {
    Abierta,
    EnProceso,
    EnEspera,
    Resuelta,
    Cerrada,
    Descartada,
}

/// Statuses that count as backlog. `open` and `pendiente` are legacy spellings still
/// present in older rows.
pub const OPEN_STATUSES: [&str; 5] = ["abierta", "en_proceso", "en_espera", "open", "pendiente"];
pub const CLOSED_STATUSES: [&str; 2] = ["cerrada", "resuelta"];

impl IncidentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            IncidentStatus::Abierta => "abierta",
            IncidentStatus::EnProceso => "en_proceso",
            IncidentStatus::EnEspera => "en_espera",
            IncidentStatus::Resuelta => "resuelta",
            IncidentStatus::Cerrada => "cerrada",
            IncidentStatus::Descartada => "descartada",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "abierta" => Some(IncidentStatus::Abierta),
            "en_proceso" => Some(IncidentStatus::EnProceso),
            "en_espera" => Some(IncidentStatus::EnEspera),
            "resuelta" => Some(IncidentStatus::Resuelta),
            "cerrada" => Some(IncidentStatus::Cerrada),
            "descartada" => Some(IncidentStatus::Descartada),
            _ => None,
        }
    }
}

pub fn is_open_status(raw: Option<&str>) -> bool {
    raw.map(|s| s.trim().to_lowercase())
        .is_some_and(|s| OPEN_STATUSES.contains(&s.as_str()))
}

pub fn is_closed_status(raw: Option<&str>) -> bool {
    raw.map(|s| s.trim().to_lowercase())
        .is_some_and(|s| CLOSED_STATUSES.contains(&s.as_str()))
}

/// Who raised the incident.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum IncidentOrigin {
    Beneficiario,
    Tecnico,
    Posventa,
}

impl IncidentOrigin {
    pub fn as_str(&self) -> &'static str {
        match self {
            IncidentOrigin::Beneficiario => "beneficiario",
            IncidentOrigin::Tecnico => "tecnico",
            IncidentOrigin::Posventa => "posventa",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "beneficiario" => Some(IncidentOrigin::Beneficiario),
            "tecnico" => Some(IncidentOrigin::Tecnico),
            "posventa" => Some(IncidentOrigin::Posventa),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Beneficiario,
    Tecnico,
    Administrador,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Beneficiario => "beneficiario",
            UserRole::Tecnico => "tecnico",
            UserRole::Administrador => "administrador",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "beneficiario" => Some(UserRole::Beneficiario),
            "tecnico" => Some(UserRole::Tecnico),
            "administrador" => Some(UserRole::Administrador),
            _ => None,
        }
    }
}

/// Contractual defect category, each with its own validity window from delivery.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum WarrantyClass {
    Estructura,
    Instalaciones,
    Terminaciones,
}

impl WarrantyClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            WarrantyClass::Estructura => "estructura",
            WarrantyClass::Instalaciones => "instalaciones",
            WarrantyClass::Terminaciones => "terminaciones",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "estructura" => Some(WarrantyClass::Estructura),
            "instalaciones" => Some(WarrantyClass::Instalaciones),
            "terminaciones" => Some(WarrantyClass::Terminaciones),
            _ => None,
        }
    }
}

/// Warranty facts attached to post-sale inspection items.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WarrantyFacts {
    pub class: Option<WarrantyClass>,
    /// `YYYY-MM-DD`.
    pub expires_on: Option<String>,
    pub valid_now: Option<bool>,
    pub source: Option<String>,
}

/// Incident row as read from storage.
///
/// Notes:
/// - Timestamps are canonical RFC3339 UTC strings. A value that fails to parse excludes the
///   incident only from the computation that needs that timestamp.
/// - `category`, `priority` and `status` keep the stored text; distributions normalize it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Incident {
    pub id: i64,
    pub housing_id: i64,
    /// Project recorded at report time; used only when the housing unit is not indexed.
    pub project_id: Option<i64>,
    pub category: Option<String>,
    pub description: Option<String>,
    pub priority: Option<String>,
    pub status: Option<String>,

    pub reported_by: i64,
    pub assigned_technician_id: Option<i64>,

    pub reported_at: String,
    pub assigned_at: Option<String>,
    pub in_process_at: Option<String>,
    pub resolved_at: Option<String>,
    pub closed_at: Option<String>,

    pub attention_deadline: Option<String>,
    pub closure_deadline: Option<String>,

    pub origin: Option<IncidentOrigin>,
    pub warranty: Option<WarrantyFacts>,
}

impl Incident {
    /// Close timestamp when present, otherwise the resolve timestamp.
    pub fn settled_at(&self) -> Option<&str> {
        self.closed_at.as_deref().or(self.resolved_at.as_deref())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Housing {
    pub id: i64,
    pub project_id: Option<i64>,
    pub delivery_date: Option<String>,
    pub address: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Project {
    pub id: i64,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Technician {
    pub id: i64,
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: UserRole,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ValidationWarning {
    pub code: String,
    pub message: String,
    pub details: Option<String>,
}

impl ValidationWarning {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_and_closed_sets_are_case_insensitive() {
        assert!(is_open_status(Some("Abierta")));
        assert!(is_open_status(Some(" PENDIENTE ")));
        assert!(is_open_status(Some("open")));
        assert!(!is_open_status(Some("cerrada")));
        assert!(!is_open_status(None));

        assert!(is_closed_status(Some("RESUELTA")));
        assert!(!is_closed_status(Some("descartada")));
    }

    #[test]
    fn settled_prefers_closed_timestamp() {
        let mut inc = Incident {
            id: 1,
            housing_id: 1,
            project_id: None,
            category: None,
            description: None,
            priority: None,
            status: None,
            reported_by: 1,
            assigned_technician_id: None,
            reported_at: "2026-01-01T00:00:00Z".to_string(),
            assigned_at: None,
            in_process_at: None,
            resolved_at: Some("2026-01-02T00:00:00Z".to_string()),
            closed_at: None,
            attention_deadline: None,
            closure_deadline: None,
            origin: None,
            warranty: None,
        };
        assert_eq!(inc.settled_at(), Some("2026-01-02T00:00:00Z"));
        inc.closed_at = Some("2026-01-03T00:00:00Z".to_string());
        assert_eq!(inc.settled_at(), Some("2026-01-03T00:00:00Z"));
    }
}
