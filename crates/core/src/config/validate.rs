use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Notification buffer is not 0
/// - Concurrent job limit, when set, is not 0
/// - Lookup table extension is not empty
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.pipeline.notification_buffer == 0 {
        return Err(ConfigError::ValidationError(
            "pipeline.notification_buffer cannot be 0".to_string(),
        ));
    }

    if config.pipeline.max_concurrent_jobs == Some(0) {
        return Err(ConfigError::ValidationError(
            "pipeline.max_concurrent_jobs cannot be 0 (omit it for no limit)".to_string(),
        ));
    }

    if config.tables.extension.trim().trim_start_matches('.').is_empty() {
        return Err(ConfigError::ValidationError(
            "tables.extension cannot be empty".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_default_config() {
        assert!(validate_config(&Config::default()).is_ok());
    }

    #[test]
    fn test_validate_zero_buffer_fails() {
        let mut config = Config::default();
        config.pipeline.notification_buffer = 0;
        let result = validate_config(&config);
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_validate_zero_job_limit_fails() {
        let mut config = Config::default();
        config.pipeline.max_concurrent_jobs = Some(0);
        assert!(validate_config(&config).is_err());

        config.pipeline.max_concurrent_jobs = Some(1);
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validate_empty_extension_fails() {
        let mut config = Config::default();
        config.tables.extension = ".".to_string();
        assert!(validate_config(&config).is_err());
    }
}
