use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use tracing::{debug, warn};

use crate::analytics::AggregationWindow;
use crate::domain::{
    Housing, Incident, IncidentOrigin, Project, Technician, UserRole, WarrantyClass,
    WarrantyFacts,
};
use crate::error::AppError;
use crate::normalize::timestamps::parse_timestamp;

/// Read access the dashboard needs from the storage layer.
pub trait DashboardRepository {
    /// Incidents whose report date falls inside the window.
    fn fetch_incidents(&self, window: &AggregationWindow) -> Result<Vec<Incident>, AppError>;
    fn fetch_housings(&self) -> Result<Vec<Housing>, AppError>;
    fn fetch_projects(&self) -> Result<Vec<Project>, AppError>;
    fn fetch_technicians(&self, ids: &[i64]) -> Result<Vec<Technician>, AppError>;
    /// Directory entries with `role`, ascending by id, at most `limit`.
    fn fetch_technicians_by_role(
        &self,
        role: UserRole,
        limit: usize,
    ) -> Result<Vec<Technician>, AppError>;
}

/// Window membership on the parsed report date. Offsets, naive and date-only values are
/// compared as instants; unparseable values are never in a window.
pub fn reported_in_window(incident: &Incident, window: &AggregationWindow) -> bool {
    parse_timestamp(&incident.reported_at).is_some_and(|dt| window.contains(dt))
}

/// Fixture-backed repository.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRepository {
    pub incidents: Vec<Incident>,
    pub housings: Vec<Housing>,
    pub projects: Vec<Project>,
    pub technicians: Vec<Technician>,
}

impl DashboardRepository for InMemoryRepository {
    fn fetch_incidents(&self, window: &AggregationWindow) -> Result<Vec<Incident>, AppError> {
        Ok(self
            .incidents
            .iter()
            .filter(|i| reported_in_window(i, window))
            .cloned()
            .collect())
    }

    fn fetch_housings(&self) -> Result<Vec<Housing>, AppError> {
        Ok(self.housings.clone())
    }

    fn fetch_projects(&self) -> Result<Vec<Project>, AppError> {
        Ok(self.projects.clone())
    }

    fn fetch_technicians(&self, ids: &[i64]) -> Result<Vec<Technician>, AppError> {
        Ok(self
            .technicians
            .iter()
            .filter(|t| ids.contains(&t.id))
            .cloned()
            .collect())
    }

    fn fetch_technicians_by_role(
        &self,
        role: UserRole,
        limit: usize,
    ) -> Result<Vec<Technician>, AppError> {
        let mut out = self
            .technicians
            .iter()
            .filter(|t| t.role == role)
            .cloned()
            .collect::<Vec<_>>();
        out.sort_by_key(|t| t.id);
        out.truncate(limit);
        Ok(out)
    }
}

/// SQLite-backed repository over a migrated connection.
pub struct SqliteRepository<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteRepository<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }
}

const INCIDENT_COLUMNS: &str = r#"
  id, housing_id, project_id, category, description, priority, status,
  reported_by, assigned_technician_id,
  reported_at, assigned_at, in_process_at, resolved_at, closed_at,
  attention_deadline, closure_deadline, origin,
  warranty_class, warranty_expires_on, warranty_valid_now, warranty_source
"#;

fn incident_from_row(row: &Row<'_>) -> rusqlite::Result<Incident> {
    let origin: Option<String> = row.get(16)?;
    let warranty_class: Option<String> = row.get(17)?;
    let warranty_expires_on: Option<String> = row.get(18)?;
    let warranty_valid_now: Option<bool> = row.get(19)?;
    let warranty_source: Option<String> = row.get(20)?;

    let warranty = if warranty_class.is_some()
        || warranty_expires_on.is_some()
        || warranty_valid_now.is_some()
        || warranty_source.is_some()
    {
        Some(WarrantyFacts {
            class: warranty_class.as_deref().and_then(WarrantyClass::parse),
            expires_on: warranty_expires_on,
            valid_now: warranty_valid_now,
            source: warranty_source,
        })
    } else {
        None
    };

    Ok(Incident {
        id: row.get(0)?,
        housing_id: row.get(1)?,
        project_id: row.get(2)?,
        category: row.get(3)?,
        description: row.get(4)?,
        priority: row.get(5)?,
        status: row.get(6)?,
        reported_by: row.get(7)?,
        assigned_technician_id: row.get(8)?,
        reported_at: row.get(9)?,
        assigned_at: row.get(10)?,
        in_process_at: row.get(11)?,
        resolved_at: row.get(12)?,
        closed_at: row.get(13)?,
        attention_deadline: row.get(14)?,
        closure_deadline: row.get(15)?,
        origin: origin.as_deref().and_then(IncidentOrigin::parse),
        warranty,
    })
}

type UserRow = (i64, Option<String>, Option<String>, String);

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<UserRow> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
}

fn technicians_from_rows(rows: Vec<UserRow>) -> Vec<Technician> {
    rows.into_iter()
        .filter_map(|(id, name, email, role)| match UserRole::parse(&role) {
            Some(role) => Some(Technician {
                id,
                name,
                email,
                role,
            }),
            None => {
                warn!(user_id = id, role = %role, "skipping user with unknown role");
                None
            }
        })
        .collect()
}

fn collect_rows<T>(
    rows: impl Iterator<Item = rusqlite::Result<T>>,
    what: &'static str,
) -> Result<Vec<T>, AppError> {
    let mut out = Vec::new();
    for r in rows {
        out.push(r.map_err(|e| {
            AppError::new("DB_QUERY_FAILED", format!("Failed to decode {what} row"))
                .with_details(e.to_string())
        })?);
    }
    Ok(out)
}

impl DashboardRepository for SqliteRepository<'_> {
    fn fetch_incidents(&self, window: &AggregationWindow) -> Result<Vec<Incident>, AppError> {
        // Stored report dates are not guaranteed canonical, so the window is applied after
        // parsing rather than as a text comparison in SQL.
        let mut stmt = self
            .conn
            .prepare(&format!(
                "SELECT {INCIDENT_COLUMNS} FROM incidents ORDER BY id ASC"
            ))
            .map_err(AppError::db(
                "DB_QUERY_FAILED",
                "Failed to prepare incidents query",
            ))?;
        let rows = stmt
            .query_map([], incident_from_row)
            .map_err(AppError::db("DB_QUERY_FAILED", "Failed to query incidents"))?;
        let all = collect_rows(rows, "incident")?;
        let scanned = all.len();
        let in_window = all
            .into_iter()
            .filter(|i| reported_in_window(i, window))
            .collect::<Vec<_>>();
        debug!(scanned, in_window = in_window.len(), "incidents filtered by window");
        Ok(in_window)
    }

    fn fetch_housings(&self) -> Result<Vec<Housing>, AppError> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, project_id, delivery_date, address FROM housings ORDER BY id ASC")
            .map_err(AppError::db(
                "DB_QUERY_FAILED",
                "Failed to prepare housings query",
            ))?;
        let rows = stmt
            .query_map([], |row| {
                Ok(Housing {
                    id: row.get(0)?,
                    project_id: row.get(1)?,
                    delivery_date: row.get(2)?,
                    address: row.get(3)?,
                })
            })
            .map_err(AppError::db("DB_QUERY_FAILED", "Failed to query housings"))?;
        collect_rows(rows, "housing")
    }

    fn fetch_projects(&self) -> Result<Vec<Project>, AppError> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name FROM projects ORDER BY id ASC")
            .map_err(AppError::db(
                "DB_QUERY_FAILED",
                "Failed to prepare projects query",
            ))?;
        let rows = stmt
            .query_map([], |row| {
                Ok(Project {
                    id: row.get(0)?,
                    name: row.get(1)?,
                })
            })
            .map_err(AppError::db("DB_QUERY_FAILED", "Failed to query projects"))?;
        collect_rows(rows, "project")
    }

    fn fetch_technicians(&self, ids: &[i64]) -> Result<Vec<Technician>, AppError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let placeholders = (1..=ids.len())
            .map(|i| format!("?{i}"))
            .collect::<Vec<_>>()
            .join(", ");
        let mut stmt = self
            .conn
            .prepare(&format!(
                "SELECT id, name, email, role FROM users WHERE id IN ({placeholders}) ORDER BY id ASC"
            ))
            .map_err(AppError::db(
                "DB_QUERY_FAILED",
                "Failed to prepare technicians query",
            ))?;
        let rows = stmt
            .query_map(params_from_iter(ids.iter()), user_from_row)
            .map_err(AppError::db("DB_QUERY_FAILED", "Failed to query technicians"))?;
        Ok(technicians_from_rows(collect_rows(rows, "user")?))
    }

    fn fetch_technicians_by_role(
        &self,
        role: UserRole,
        limit: usize,
    ) -> Result<Vec<Technician>, AppError> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, email, role FROM users WHERE role = ?1 ORDER BY id ASC LIMIT ?2")
            .map_err(AppError::db(
                "DB_QUERY_FAILED",
                "Failed to prepare technicians-by-role query",
            ))?;
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = stmt
            .query_map(params![role.as_str(), limit], user_from_row)
            .map_err(AppError::db(
                "DB_QUERY_FAILED",
                "Failed to query technicians by role",
            ))?;
        Ok(technicians_from_rows(collect_rows(rows, "user")?))
    }
}

pub fn insert_project(conn: &Connection, project: &Project) -> Result<(), AppError> {
    conn.execute(
        "INSERT INTO projects(id, name) VALUES (?1, ?2)",
        params![project.id, project.name],
    )
    .map_err(AppError::db("DB_INSERT_FAILED", "Failed to insert project"))?;
    Ok(())
}

pub fn insert_housing(conn: &Connection, housing: &Housing) -> Result<(), AppError> {
    conn.execute(
        "INSERT INTO housings(id, project_id, delivery_date, address) VALUES (?1, ?2, ?3, ?4)",
        params![
            housing.id,
            housing.project_id,
            housing.delivery_date,
            housing.address
        ],
    )
    .map_err(AppError::db("DB_INSERT_FAILED", "Failed to insert housing"))?;
    Ok(())
}

pub fn insert_user(conn: &Connection, user: &Technician) -> Result<(), AppError> {
    conn.execute(
        "INSERT INTO users(id, name, email, role) VALUES (?1, ?2, ?3, ?4)",
        params![user.id, user.name, user.email, user.role.as_str()],
    )
    .map_err(AppError::db("DB_INSERT_FAILED", "Failed to insert user"))?;
    Ok(())
}

pub fn insert_incident(conn: &Connection, incident: &Incident) -> Result<(), AppError> {
    let warranty = incident.warranty.as_ref();
    conn.execute(
        &format!(
            "INSERT INTO incidents({INCIDENT_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21)"
        ),
        params![
            incident.id,
            incident.housing_id,
            incident.project_id,
            incident.category,
            incident.description,
            incident.priority,
            incident.status,
            incident.reported_by,
            incident.assigned_technician_id,
            incident.reported_at,
            incident.assigned_at,
            incident.in_process_at,
            incident.resolved_at,
            incident.closed_at,
            incident.attention_deadline,
            incident.closure_deadline,
            incident.origin.map(|o| o.as_str()),
            warranty.and_then(|w| w.class).map(|c| c.as_str()),
            warranty.and_then(|w| w.expires_on.clone()),
            warranty.and_then(|w| w.valid_now),
            warranty.and_then(|w| w.source.clone()),
        ],
    )
    .map_err(|e| {
        AppError::new("DB_INSERT_FAILED", "Failed to insert incident")
            .with_details(format!("id={}; err={e}", incident.id))
    })?;
    Ok(())
}

pub fn fetch_incident(conn: &Connection, id: i64) -> Result<Option<Incident>, AppError> {
    conn.query_row(
        &format!("SELECT {INCIDENT_COLUMNS} FROM incidents WHERE id = ?1"),
        [id],
        incident_from_row,
    )
    .optional()
    .map_err(|e| {
        AppError::new("DB_QUERY_FAILED", "Failed to load incident")
            .with_details(format!("id={id}; err={e}"))
    })
}

pub fn fetch_housing(conn: &Connection, id: i64) -> Result<Option<Housing>, AppError> {
    conn.query_row(
        "SELECT id, project_id, delivery_date, address FROM housings WHERE id = ?1",
        [id],
        |row| {
            Ok(Housing {
                id: row.get(0)?,
                project_id: row.get(1)?,
                delivery_date: row.get(2)?,
                address: row.get(3)?,
            })
        },
    )
    .optional()
    .map_err(|e| {
        AppError::new("DB_QUERY_FAILED", "Failed to load housing")
            .with_details(format!("id={id}; err={e}"))
    })
}

pub fn next_incident_id(conn: &Connection) -> Result<i64, AppError> {
    conn.query_row("SELECT COALESCE(MAX(id), 0) + 1 FROM incidents", [], |row| {
        row.get(0)
    })
    .map_err(AppError::db("DB_QUERY_FAILED", "Failed to allocate incident id"))
}

/// Persist the mutable lifecycle fields of an existing incident.
pub fn update_incident_lifecycle(conn: &Connection, incident: &Incident) -> Result<(), AppError> {
    let changed = conn
        .execute(
            r#"
UPDATE incidents
SET status = ?2,
    assigned_technician_id = ?3,
    assigned_at = ?4,
    in_process_at = ?5,
    resolved_at = ?6,
    closed_at = ?7
WHERE id = ?1
"#,
            params![
                incident.id,
                incident.status,
                incident.assigned_technician_id,
                incident.assigned_at,
                incident.in_process_at,
                incident.resolved_at,
                incident.closed_at,
            ],
        )
        .map_err(|e| {
            AppError::new("DB_UPDATE_FAILED", "Failed to update incident")
                .with_details(format!("id={}; err={e}", incident.id))
        })?;
    if changed == 0 {
        return Err(AppError::new("DB_NOT_FOUND", "Incident not found")
            .with_details(format!("id={}", incident.id)));
    }
    Ok(())
}
