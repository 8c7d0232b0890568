use serde::{Deserialize, Serialize};
use std::fmt;

/// Structured error shared by the storage adapter, configuration loading and lifecycle
/// rules. Per-record data problems are never errors; see `domain::ValidationWarning`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppError {
    pub code: String,
    pub message: String,
    pub details: Option<String>,
    pub retryable: bool,
}

impl AppError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
            retryable: false,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_retryable(mut self, retryable: bool) -> Self {
        self.retryable = retryable;
        self
    }

    /// Adapter for `map_err` on storage calls: keeps the driver message as details.
    pub fn db<E: fmt::Display>(
        code: &'static str,
        message: &'static str,
    ) -> impl FnOnce(E) -> AppError {
        move |e| AppError::new(code, message).with_details(e.to_string())
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for AppError {}
