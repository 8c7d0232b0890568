mod cli;

use anyhow::{bail, Context};
use clap::Parser;
use serde_json::json;
use time::OffsetDateTime;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use triage_core::{
    analytics::{build_dashboard, AggregationWindow},
    classify::classify_with_rule,
    config::{LoggingConfig, Settings},
    db,
    demo::seed_demo_dataset,
    intake::{triage_report, NewIncidentReport},
    lifecycle::{assign, transition},
    normalize::timestamps::{format_rfc3339, normalize_timestamp, parse_date, parse_timestamp},
    repo::{
        fetch_housing, fetch_incident, insert_incident, next_incident_id,
        update_incident_lifecycle, SqliteRepository,
    },
    report::render_dashboard_markdown,
    warranty::WarrantyResolver,
};

use crate::cli::{Cli, Commands, OutputFormat};

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::InitDb { db } => {
            init_logging(&LoggingConfig::default());
            db::open_and_migrate(&db)?;
            info!(path = %db.display(), "database ready");
            println!("Initialized {}", db.display());
        }

        Commands::SeedDemo { db, config } => {
            let settings = load_settings(&config)?;
            let mut conn = db::open_and_migrate(&db)?;
            let summary = seed_demo_dataset(&mut conn, &settings, OffsetDateTime::now_utc())?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }

        Commands::Dashboard {
            db,
            config,
            days,
            format,
        } => {
            let settings = load_settings(&config)?;
            let conn = db::open_and_migrate(&db)?;
            let window =
                AggregationWindow::ending_now(days.unwrap_or(settings.dashboard.default_days))?;
            let report = build_dashboard(&SqliteRepository::new(&conn), &window, &settings.dashboard)?;
            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
                OutputFormat::Markdown => print!("{}", render_dashboard_markdown(&report)),
            }
        }

        Commands::Classify {
            config,
            category,
            description,
            reported_at,
        } => {
            let settings = load_settings(&config)?;
            let mut warnings = Vec::new();
            let reported_at = match reported_at {
                Some(raw) => {
                    let normalized = normalize_timestamp("reported_at", &raw, &mut warnings);
                    normalized
                        .canonical_rfc3339_utc
                        .as_deref()
                        .and_then(parse_timestamp)
                        .with_context(|| format!("unparseable --reported-at `{raw}`"))?
                }
                None => OffsetDateTime::now_utc(),
            };
            for w in &warnings {
                warn!(code = %w.code, details = ?w.details, "{}", w.message);
            }

            let (priority, rule) = classify_with_rule(&category, &description);
            let deadlines = settings.sla.deadlines(Some(priority), reported_at);
            let out = json!({
                "priority": priority,
                "rule": rule,
                "reportedAt": format_rfc3339(reported_at)?,
                "attentionDeadline": format_rfc3339(deadlines.attention)?,
                "closureDeadline": format_rfc3339(deadlines.closure)?,
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }

        Commands::Report {
            db,
            config,
            housing,
            reported_by,
            category,
            description,
            origin,
        } => {
            let settings = load_settings(&config)?;
            let resolver = WarrantyResolver::new(settings.warranty)?;
            let conn = db::open_and_migrate(&db)?;
            let Some(housing) = fetch_housing(&conn, housing)? else {
                bail!("housing unit {housing} does not exist");
            };

            let now = OffsetDateTime::now_utc();
            let triaged = triage_report(
                NewIncidentReport {
                    housing_id: housing.id,
                    project_id: housing.project_id,
                    category,
                    description,
                    reported_by,
                    origin,
                    reported_at: now,
                },
                housing.delivery_date.as_deref().and_then(parse_date),
                &settings.sla,
                &resolver,
                now.date(),
            );
            let incident = triaged.into_incident(next_incident_id(&conn)?)?;
            insert_incident(&conn, &incident)?;
            info!(
                incident_id = incident.id,
                priority = incident.priority.as_deref().unwrap_or_default(),
                "incident stored"
            );
            println!("{}", serde_json::to_string_pretty(&incident)?);
        }

        Commands::Assign {
            db,
            incident,
            technician,
        } => {
            init_logging(&LoggingConfig::default());
            let conn = db::open_and_migrate(&db)?;
            let Some(mut row) = fetch_incident(&conn, incident)? else {
                bail!("incident {incident} does not exist");
            };
            assign(&mut row, technician, OffsetDateTime::now_utc())?;
            update_incident_lifecycle(&conn, &row)?;
            println!("{}", serde_json::to_string_pretty(&row)?);
        }

        Commands::SetStatus {
            db,
            incident,
            status,
        } => {
            init_logging(&LoggingConfig::default());
            let conn = db::open_and_migrate(&db)?;
            let Some(mut row) = fetch_incident(&conn, incident)? else {
                bail!("incident {incident} does not exist");
            };
            transition(&mut row, status, OffsetDateTime::now_utc())?;
            update_incident_lifecycle(&conn, &row)?;
            println!("{}", serde_json::to_string_pretty(&row)?);
        }
    }

    Ok(())
}

fn load_settings(path: &std::path::Path) -> anyhow::Result<Settings> {
    let settings = Settings::load(path)
        .with_context(|| format!("loading configuration from {}", path.display()))?;
    init_logging(&settings.logging);
    info!(path = %path.display(), "configuration loaded");
    Ok(settings)
}

fn init_logging(logging: &LoggingConfig) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

    match logging.format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().pretty().with_writer(std::io::stderr))
                .init();
        }
    }
}
