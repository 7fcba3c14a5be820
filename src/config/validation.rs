use crate::config::parser::parse_rate_limit;
use crate::config::types::{HttpOptions, MirrorConfig, MirrorOptions};
use crate::ConfigError;

/// Upper bound on concurrent workers
pub const MAX_WORKERS: usize = 64;

/// Validates the entire configuration
pub fn validate(config: &MirrorConfig) -> Result<(), ConfigError> {
    validate_mirror_options(&config.mirror)?;
    validate_http_options(&config.http)?;
    Ok(())
}

/// Validates mirror options
fn validate_mirror_options(options: &MirrorOptions) -> Result<(), ConfigError> {
    if options.output_dir.trim().is_empty() {
        return Err(ConfigError::Validation(
            "output-dir cannot be empty".to_string(),
        ));
    }

    if options.workers < 1 || options.workers > MAX_WORKERS {
        return Err(ConfigError::Validation(format!(
            "workers must be between 1 and {}, got {}",
            MAX_WORKERS, options.workers
        )));
    }

    Ok(())
}

/// Validates HTTP client options
fn validate_http_options(options: &HttpOptions) -> Result<(), ConfigError> {
    if options.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user-agent cannot be empty".to_string(),
        ));
    }

    if options.timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "timeout-secs must be >= 1, got {}",
            options.timeout_secs
        )));
    }

    if options.connect_timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "connect-timeout-secs must be >= 1, got {}",
            options.connect_timeout_secs
        )));
    }

    if let Some(rate) = &options.rate_limit {
        parse_rate_limit(rate)?;
    }

    Ok(())
}
