use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};

use crate::config::Settings;
use crate::domain::{Housing, IncidentOrigin, IncidentStatus, Project, Technician, UserRole};
use crate::error::AppError;
use crate::intake::{triage_report, NewIncidentReport};
use crate::lifecycle::{assign, transition};
use crate::normalize::timestamps::parse_date;
use crate::repo::{insert_housing, insert_incident, insert_project, insert_user};
use crate::warranty::WarrantyResolver;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DemoSeedSummary {
    pub projects: i64,
    pub housings: i64,
    pub users: i64,
    pub incidents: i64,
}

// (category, description, origin)
const DEMO_REPORTS: [(&str, &str, IncidentOrigin); 10] = [
    ("plomería", "Se siente olor a gas en la cocina", IncidentOrigin::Beneficiario),
    ("eléctrico", "La luz del living parpadea", IncidentOrigin::Beneficiario),
    ("eléctrico", "Hay un corto circuito en el enchufe", IncidentOrigin::Tecnico),
    ("plomería", "Fuga bajo el lavaplatos", IncidentOrigin::Beneficiario),
    ("estructura", "Grieta diagonal en muro del dormitorio", IncidentOrigin::Posventa),
    ("terminaciones", "Pintura descascarada en el pasillo", IncidentOrigin::Posventa),
    ("", "El baño no funciona, el inodoro rebalsa", IncidentOrigin::Beneficiario),
    ("puertas", "La bisagra de la puerta principal está suelta", IncidentOrigin::Posventa),
    ("agua", "Casa sin agua desde ayer", IncidentOrigin::Beneficiario),
    ("estructura", "Humedad en el techo de la cocina", IncidentOrigin::Tecnico),
];

fn demo_projects() -> Vec<Project> {
    vec![
        Project {
            id: 1,
            name: Some("Villa Los Aromos".to_string()),
        },
        Project {
            id: 2,
            name: Some("Condominio El Roble".to_string()),
        },
        Project {
            id: 3,
            name: Some("Loteo Sin Entregar".to_string()),
        },
    ]
}

fn demo_housings() -> Vec<Housing> {
    (1..=12)
        .map(|i| Housing {
            id: i,
            project_id: Some(if i <= 8 { 1 } else { 2 }),
            delivery_date: Some(format!("20{:02}-03-{:02}", 18 + (i % 6), 1 + i)),
            address: Some(format!("Pasaje {} #{}", if i <= 8 { "Aromo" } else { "Roble" }, 100 + i)),
        })
        .collect()
}

fn demo_users() -> Vec<Technician> {
    let mut users = vec![
        Technician {
            id: 1,
            name: Some("Administración".to_string()),
            email: Some("admin@example.org".to_string()),
            role: UserRole::Administrador,
        },
        Technician {
            id: 2,
            name: Some("Beneficiaria Demo".to_string()),
            email: Some("beneficiaria@example.org".to_string()),
            role: UserRole::Beneficiario,
        },
    ];
    for (id, name) in [(10, "Ana Pérez"), (11, "Bruno Díaz"), (12, "Carla Soto")] {
        users.push(Technician {
            id,
            name: Some(name.to_string()),
            email: Some(format!("tecnico{id}@example.org")),
            role: UserRole::Tecnico,
        });
    }
    users
}

/// Seed a deterministic dataset spread over the 120 days before `now`.
///
/// Incidents go through the same intake and lifecycle code as production rows, so their
/// priorities, deadlines and timestamps are consistent.
pub fn seed_demo_dataset(
    conn: &mut Connection,
    settings: &Settings,
    now: OffsetDateTime,
) -> Result<DemoSeedSummary, AppError> {
    let resolver = WarrantyResolver::new(settings.warranty)?;
    let projects = demo_projects();
    let housings = demo_housings();
    let users = demo_users();
    let technician_ids = [10_i64, 11, 12];

    let tx = conn.transaction().map_err(AppError::db(
        "DB_TX_FAILED",
        "Failed to start demo seed transaction",
    ))?;

    for p in &projects {
        insert_project(&tx, p)?;
    }
    for h in &housings {
        insert_housing(&tx, h)?;
    }
    for u in &users {
        insert_user(&tx, u)?;
    }

    let total = 40_i64;
    for i in 0..total {
        let (category, description, origin) = DEMO_REPORTS[(i as usize) % DEMO_REPORTS.len()];
        let housing = &housings[(i as usize * 5) % housings.len()];
        let reported_at = now - Duration::days(3 * i) - Duration::hours(i % 7);

        let triaged = triage_report(
            NewIncidentReport {
                housing_id: housing.id,
                project_id: housing.project_id,
                category: category.to_string(),
                description: description.to_string(),
                reported_by: 2,
                origin,
                reported_at,
            },
            housing.delivery_date.as_deref().and_then(parse_date),
            &settings.sla,
            &resolver,
            now.date(),
        );
        let mut incident = triaged.into_incident(i + 1)?;

        // Progress older incidents further along the lifecycle.
        let assigned_after = Duration::days(1 + i % 12);
        if i % 9 != 0 {
            let tech = technician_ids[(i as usize) % technician_ids.len()];
            assign(&mut incident, tech, reported_at + assigned_after)?;
        } else if i % 2 == 1 {
            transition(&mut incident, IncidentStatus::Descartada, reported_at)?;
        }
        if i % 5 == 1 && incident.assigned_at.is_some() {
            transition(
                &mut incident,
                IncidentStatus::EnEspera,
                reported_at + assigned_after + Duration::days(1),
            )?;
        }
        if i >= 6 && i % 3 == 0 && incident.assigned_at.is_some() {
            let resolved = reported_at + assigned_after + Duration::days(3 + i % 20);
            if resolved <= now {
                transition(&mut incident, IncidentStatus::Resuelta, resolved)?;
                let closed = resolved + Duration::days(2);
                if closed <= now && i % 2 == 0 {
                    transition(&mut incident, IncidentStatus::Cerrada, closed)?;
                }
            }
        }

        insert_incident(&tx, &incident)?;
    }

    tx.commit().map_err(AppError::db(
        "DB_TX_FAILED",
        "Failed to commit demo seed transaction",
    ))?;

    tracing::info!(incidents = total, "seeded demo dataset");

    Ok(DemoSeedSummary {
        projects: projects.len() as i64,
        housings: housings.len() as i64,
        users: users.len() as i64,
        incidents: total,
    })
}
