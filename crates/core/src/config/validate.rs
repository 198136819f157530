use super::{types::Config, ConfigError};

/// Validate a configuration before it is persisted.
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.tracker_user.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "tracker_user is required".to_string(),
        ));
    }
    if config.save_path.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "save_path is required".to_string(),
        ));
    }
    if config.client_url.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "client_url is required".to_string(),
        ));
    }
    if config.check_interval_minutes == 0 {
        return Err(ConfigError::ValidationError(
            "check_interval_minutes must be greater than 0".to_string(),
        ));
    }
    if config.max_episodes_per_series == 0 {
        return Err(ConfigError::ValidationError(
            "max_episodes_per_series must be greater than 0".to_string(),
        ));
    }
    if config.episode_retry_limit == 0 {
        return Err(ConfigError::ValidationError(
            "episode_retry_limit must be greater than 0".to_string(),
        ));
    }
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    Ok(())
}
