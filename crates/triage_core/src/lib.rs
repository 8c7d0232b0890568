pub mod analytics;
pub mod classify;
pub mod config;
pub mod db;
pub mod demo;
pub mod domain;
pub mod error;
pub mod intake;
pub mod lifecycle;
pub mod metrics;
pub mod normalize;
pub mod repo;
pub mod report;
pub mod sla;
pub mod warranty;

#[cfg(test)]
mod tests {
    use super::error::AppError;

    #[test]
    fn app_error_is_structured() {
        let err = AppError::new("CONFIG_INVALID", "bad settings").with_retryable(false);
        assert_eq!(err.code, "CONFIG_INVALID");
        assert_eq!(err.message, "bad settings");
        assert!(!err.retryable);
    }
}
