use super::Config;
use crate::error::AppError;
use std::path::Path;

/// Validates the configuration settings
///
/// # Validation Rules
/// - API domain cannot be empty and must look like a URL or domain name
/// - HTTP timeout, cache TTL, sweep interval, cache capacity and retry
///   attempts must all be non-zero
/// - If a log file path is provided, it cannot be empty and its parent
///   directory must exist or be creatable
pub fn validate_config(config: &Config) -> Result<(), AppError> {
    validate_api_domain(&config.api_domain)?;

    let non_zero = [
        ("http_timeout_seconds", config.http_timeout_seconds),
        ("cache_ttl_seconds", config.cache_ttl_seconds),
        (
            "cache_sweep_interval_seconds",
            config.cache_sweep_interval_seconds,
        ),
        ("cache_capacity", config.cache_capacity as u64),
        ("max_retries", u64::from(config.max_retries)),
    ];
    if let Some((name, _)) = non_zero.iter().find(|(_, value)| *value == 0) {
        return Err(AppError::config_error(format!(
            "{name} must be greater than zero"
        )));
    }

    if let Some(log_path) = &config.log_file_path {
        validate_log_path(log_path)?;
    }

    Ok(())
}

fn validate_api_domain(api_domain: &str) -> Result<(), AppError> {
    if api_domain.trim().is_empty() {
        return Err(AppError::config_error("API domain cannot be empty"));
    }

    if !api_domain.starts_with("http://")
        && !api_domain.starts_with("https://")
        && !api_domain.contains('.')
        && !api_domain.starts_with("localhost")
    {
        return Err(AppError::config_error(
            "API domain must be a valid URL or domain name",
        ));
    }

    Ok(())
}

fn validate_log_path(log_path: &str) -> Result<(), AppError> {
    if log_path.is_empty() {
        return Err(AppError::config_error("Log file path cannot be empty"));
    }

    if let Some(parent) = Path::new(log_path).parent()
        && !parent.as_os_str().is_empty()
        && !parent.exists()
    {
        std::fs::create_dir_all(parent).map_err(|e| {
            AppError::config_error(format!(
                "Cannot create log directory '{}': {}",
                parent.display(),
                e
            ))
        })?;
    }

    Ok(())
}
