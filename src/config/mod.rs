use crate::constants::{self, env_vars};
use crate::error::AppError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::fs;
use tokio::io::AsyncWriteExt;

pub mod paths;
pub mod validation;

use paths::{get_config_path, get_log_dir_path};
use validation::validate_config;

/// Configuration structure for the application.
/// Handles loading, saving, and managing application settings.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Config {
    /// Base URL of the NEIS open data hub.
    #[serde(default = "default_api_domain")]
    pub api_domain: String,
    /// NEIS API key. Requests go out without one when unset, which the hub
    /// answers with a small sample page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Path to the log file. If not specified, logs will be written to a default location.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_file_path: Option<String>,
    /// HTTP timeout in seconds for each upstream attempt.
    #[serde(default = "default_http_timeout")]
    pub http_timeout_seconds: u64,
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_seconds: u64,
    #[serde(default = "default_sweep_interval")]
    pub cache_sweep_interval_seconds: u64,
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,
    /// Total attempts per upstream request, the first one included.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_base_delay")]
    pub retry_base_delay_ms: u64,
    /// Whether 4xx responses other than 429 are retried.
    #[serde(default = "default_retry_client_errors")]
    pub retry_client_errors: bool,
}

fn default_api_domain() -> String {
    constants::DEFAULT_API_DOMAIN.to_string()
}

fn default_http_timeout() -> u64 {
    constants::DEFAULT_HTTP_TIMEOUT_SECONDS
}

fn default_cache_ttl() -> u64 {
    constants::cache::TTL_SECONDS
}

fn default_sweep_interval() -> u64 {
    constants::cache::SWEEP_INTERVAL_SECONDS
}

fn default_cache_capacity() -> usize {
    constants::cache::MAX_ENTRIES
}

fn default_max_retries() -> u32 {
    constants::retry::MAX_ATTEMPTS
}

fn default_retry_base_delay() -> u64 {
    constants::retry::BASE_DELAY_MS
}

fn default_retry_client_errors() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Config {
            api_domain: default_api_domain(),
            api_key: None,
            log_file_path: None,
            http_timeout_seconds: default_http_timeout(),
            cache_ttl_seconds: default_cache_ttl(),
            cache_sweep_interval_seconds: default_sweep_interval(),
            cache_capacity: default_cache_capacity(),
            max_retries: default_max_retries(),
            retry_base_delay_ms: default_retry_base_delay(),
            retry_client_errors: default_retry_client_errors(),
        }
    }
}

impl Config {
    /// Loads configuration from the default config file location.
    /// A missing file means defaults. Environment variables override file values.
    ///
    /// # Environment Variables
    /// - `NEIS_API_DOMAIN` - Override API domain
    /// - `NEIS_API_KEY` - Override API key
    /// - `NEIS_LOG_FILE` - Override log file path
    /// - `NEIS_HTTP_TIMEOUT` - Override HTTP timeout in seconds
    pub async fn load() -> Result<Self, AppError> {
        Self::load_layered(&get_config_path()).await
    }

    /// Loads `path` if it exists (defaults otherwise), applies environment
    /// overrides and validates the result.
    pub async fn load_layered(path: &str) -> Result<Self, AppError> {
        let mut config = if Path::new(path).exists() {
            Self::load_from_path(path).await?
        } else {
            Config::default()
        };

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Applies `NEIS_*` environment overrides in place. Unparseable
    /// timeout values are ignored.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(api_domain) = std::env::var(env_vars::API_DOMAIN) {
            self.api_domain = api_domain;
        }

        if let Ok(api_key) = std::env::var(env_vars::API_KEY) {
            self.api_key = Some(api_key).filter(|key| !key.is_empty());
        }

        if let Ok(log_file_path) = std::env::var(env_vars::LOG_FILE) {
            self.log_file_path = Some(log_file_path);
        }

        if let Some(timeout) = std::env::var(env_vars::HTTP_TIMEOUT)
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
        {
            self.http_timeout_seconds = timeout;
        }
    }

    /// Validates the configuration settings
    pub fn validate(&self) -> Result<(), AppError> {
        validate_config(self)
    }

    /// Returns the platform-specific path for the config file.
    pub fn get_config_path() -> String {
        paths::get_config_path()
    }

    /// Returns the platform-specific path for the log directory.
    pub fn get_log_dir_path() -> String {
        paths::get_log_dir_path()
    }

    /// Renders the settings for display. The API key is masked.
    pub fn describe(&self, config_path: &str) -> String {
        let separator = "────────────────────────────────────";
        let api_key = match &self.api_key {
            Some(key) if key.chars().count() > 4 => {
                format!("{}****", key.chars().take(4).collect::<String>())
            }
            Some(_) => "****".to_string(),
            None => "(not set)".to_string(),
        };
        let log_file = match &self.log_file_path {
            Some(custom_path) => custom_path.clone(),
            None => format!("{}/neis_lookup.log\n(Default location)", get_log_dir_path()),
        };

        let rows = [
            ("Config Location:", config_path.to_string()),
            ("API Domain:", self.api_domain.clone()),
            ("API Key:", api_key),
            (
                "HTTP Timeout:",
                format!("{} seconds", self.http_timeout_seconds),
            ),
            (
                "Cache:",
                format!(
                    "ttl {}s, sweep every {}s, up to {} entries",
                    self.cache_ttl_seconds, self.cache_sweep_interval_seconds, self.cache_capacity
                ),
            ),
            (
                "Retries:",
                format!(
                    "{} attempts, base delay {} ms, retry 4xx: {}",
                    self.max_retries, self.retry_base_delay_ms, self.retry_client_errors
                ),
            ),
            ("Log File Location:", log_file),
        ];

        let mut out = String::from("Current Configuration\n");
        for (label, value) in rows {
            out.push_str(separator);
            out.push('\n');
            out.push_str(label);
            out.push('\n');
            out.push_str(&value);
            out.push('\n');
        }
        out
    }

    /// Displays current configuration settings to stdout.
    pub async fn display() -> Result<(), AppError> {
        let config_path = get_config_path();

        if !Path::new(&config_path).exists() {
            println!("\nNo configuration file found at:");
            println!("{config_path}");
            println!("Using built-in defaults.");
        }

        let config = Config::load().await?;
        println!();
        print!("{}", config.describe(&config_path));
        Ok(())
    }

    /// Saves configuration to a custom file path.
    ///
    /// Creates the parent directory if needed. An API domain given without
    /// a scheme is stored with `https://`.
    ///
    /// # Errors
    /// * `AppError::Config` - If the provided path has no parent directory
    /// * `AppError::Io` - If there's an I/O error creating directories or writing the file
    /// * `AppError::TomlSerialize` - If there's an error serializing the configuration
    pub async fn save_to_path(&self, path: &str) -> Result<(), AppError> {
        let config_dir = Path::new(path).parent().ok_or_else(|| {
            AppError::config_error(format!("Path '{path}' has no parent directory"))
        })?;

        if !config_dir.exists() {
            fs::create_dir_all(config_dir).await?;
        }

        let mut stored = self.clone();
        if !stored.api_domain.starts_with("https://") && !stored.api_domain.starts_with("http://")
        {
            stored.api_domain = format!("https://{}", stored.api_domain);
        }

        let content = toml::to_string_pretty(&stored)?;
        let mut file = fs::File::create(path).await?;
        file.write_all(content.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }

    /// Loads configuration from a custom file path without env overrides.
    pub async fn load_from_path(path: &str) -> Result<Self, AppError> {
        let content = fs::read_to_string(path).await?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }
}
