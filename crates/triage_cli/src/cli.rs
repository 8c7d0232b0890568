use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use triage_core::domain::{IncidentOrigin, IncidentStatus};

#[derive(Parser)]
#[command(name = "triage")]
#[command(about = "Triage housing defect reports and compute incident dashboards", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Markdown,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create the database file and apply migrations
    InitDb {
        /// Path to the SQLite database
        #[arg(long, env = "TRIAGE_DB", default_value = "./triage.db")]
        db: PathBuf,
    },

    /// Load a deterministic demo dataset into an empty database
    SeedDemo {
        #[arg(long, env = "TRIAGE_DB", default_value = "./triage.db")]
        db: PathBuf,

        /// Path to configuration file
        #[arg(short, long, env = "TRIAGE_CONFIG", default_value = "./triage.yaml")]
        config: PathBuf,
    },

    /// Compute the incident dashboard over a trailing window
    Dashboard {
        #[arg(long, env = "TRIAGE_DB", default_value = "./triage.db")]
        db: PathBuf,

        #[arg(short, long, env = "TRIAGE_CONFIG", default_value = "./triage.yaml")]
        config: PathBuf,

        /// Window size in days (defaults to dashboard.default_days)
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
        days: Option<u32>,

        #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,
    },

    /// Classify a report and show the deadlines it would get, without storing it
    Classify {
        #[arg(short, long, env = "TRIAGE_CONFIG", default_value = "./triage.yaml")]
        config: PathBuf,

        #[arg(long, default_value = "")]
        category: String,

        #[arg(long, default_value = "")]
        description: String,

        /// Report timestamp (RFC3339; values without offset are read as UTC). Defaults to now.
        #[arg(long)]
        reported_at: Option<String>,
    },

    /// Triage and store a new incident report
    Report {
        #[arg(long, env = "TRIAGE_DB", default_value = "./triage.db")]
        db: PathBuf,

        #[arg(short, long, env = "TRIAGE_CONFIG", default_value = "./triage.yaml")]
        config: PathBuf,

        #[arg(long)]
        housing: i64,

        /// User id of the reporter
        #[arg(long)]
        reported_by: i64,

        #[arg(long, default_value = "")]
        category: String,

        #[arg(long, default_value = "")]
        description: String,

        #[arg(long, value_parser = parse_origin, default_value = "beneficiario")]
        origin: IncidentOrigin,
    },

    /// Assign a technician to an incident
    Assign {
        #[arg(long, env = "TRIAGE_DB", default_value = "./triage.db")]
        db: PathBuf,

        #[arg(long)]
        incident: i64,

        #[arg(long)]
        technician: i64,
    },

    /// Move an incident to another lifecycle status
    SetStatus {
        #[arg(long, env = "TRIAGE_DB", default_value = "./triage.db")]
        db: PathBuf,

        #[arg(long)]
        incident: i64,

        #[arg(long, value_parser = parse_status)]
        status: IncidentStatus,
    },
}

fn parse_origin(raw: &str) -> Result<IncidentOrigin, String> {
    IncidentOrigin::parse(raw)
        .ok_or_else(|| format!("unknown origin `{raw}` (beneficiario, tecnico, posventa)"))
}

fn parse_status(raw: &str) -> Result<IncidentStatus, String> {
    IncidentStatus::parse(raw).ok_or_else(|| {
        format!("unknown status `{raw}` (abierta, en_proceso, en_espera, resuelta, cerrada, descartada)")
    })
}
