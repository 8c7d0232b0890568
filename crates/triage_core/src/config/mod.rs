use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::sla::{SlaPolicy, MAX_WINDOW_DAYS};
use crate::warranty::WarrantyDurations;

pub const DEFAULT_WINDOW_DAYS: u32 = 90;
pub const CLOSED_WINDOW_DAYS: i64 = 30;
/// Inclusive upper bounds of the backlog age buckets; the last bucket is open-ended.
pub const BACKLOG_BOUNDS_DAYS: [i64; 5] = [7, 14, 30, 60, 90];
pub const TOP_N: usize = 5;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Settings {
    /// Required. Loading fails when the table is absent.
    pub warranty: WarrantyDurations,
    #[serde(default)]
    pub dashboard: DashboardSettings,
    #[serde(default)]
    pub sla: SlaPolicy,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DashboardSettings {
    pub default_days: u32,
    pub closed_window_days: i64,
    pub backlog_bounds_days: Vec<i64>,
    pub top_n: usize,
}

impl Default for DashboardSettings {
    fn default() -> Self {
        Self {
            default_days: DEFAULT_WINDOW_DAYS,
            closed_window_days: CLOSED_WINDOW_DAYS,
            backlog_bounds_days: BACKLOG_BOUNDS_DAYS.to_vec(),
            top_n: TOP_N,
        }
    }
}

impl DashboardSettings {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.default_days == 0 {
            return Err(AppError::new(
                "CONFIG_INVALID",
                "dashboard.default_days must be at least 1",
            ));
        }
        if !(1..=MAX_WINDOW_DAYS).contains(&self.closed_window_days) {
            return Err(AppError::new(
                "CONFIG_INVALID",
                format!("dashboard.closed_window_days must be between 1 and {MAX_WINDOW_DAYS}"),
            )
            .with_details(self.closed_window_days.to_string()));
        }
        if self.top_n == 0 {
            return Err(AppError::new(
                "CONFIG_INVALID",
                "dashboard.top_n must be at least 1",
            ));
        }
        let bounds = &self.backlog_bounds_days;
        if bounds.is_empty()
            || bounds[0] < 0
            || bounds.windows(2).any(|pair| pair[0] >= pair[1])
        {
            return Err(AppError::new(
                "CONFIG_INVALID",
                "dashboard.backlog_bounds_days must be non-empty, non-negative and strictly increasing",
            )
            .with_details(format!("{bounds:?}")));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Settings {
    /// Load settings from a YAML file.
    pub fn load(path: &Path) -> Result<Self, AppError> {
        if !path.exists() {
            return Err(AppError::new(
                "CONFIG_NOT_FOUND",
                "Configuration file not found",
            )
            .with_details(path.display().to_string()));
        }
        let text = std::fs::read_to_string(path).map_err(|e| {
            AppError::new("CONFIG_READ_FAILED", "Failed to read configuration file")
                .with_details(format!("{}: {e}", path.display()))
        })?;
        Self::from_yaml_str(&text)
    }

    pub fn from_yaml_str(text: &str) -> Result<Self, AppError> {
        let settings: Settings = serde_yaml::from_str(text).map_err(|e| {
            let message = if e.to_string().contains("missing field `warranty`") {
                "warranty durations are required configuration"
            } else {
                "Failed to parse configuration"
            };
            AppError::new("CONFIG_PARSE_FAILED", message).with_details(e.to_string())
        })?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        self.warranty.validate()?;
        self.dashboard.validate()?;
        for (field, days) in [
            ("alta_days", self.sla.alta_days),
            ("media_days", self.sla.media_days),
            ("baja_days", self.sla.baja_days),
            ("fallback_days", self.sla.fallback_days),
            ("closure_days", self.sla.closure_days),
        ] {
            if !(1..=MAX_WINDOW_DAYS).contains(&days) {
                return Err(AppError::new(
                    "CONFIG_INVALID",
                    format!("sla.{field} must be between 1 and {MAX_WINDOW_DAYS}"),
                )
                .with_details(days.to_string()));
            }
        }
        match self.logging.format.as_str() {
            "pretty" | "json" => Ok(()),
            other => Err(AppError::new(
                "CONFIG_INVALID",
                "logging.format must be `pretty` or `json`",
            )
            .with_details(other.to_string())),
        }
    }
}
