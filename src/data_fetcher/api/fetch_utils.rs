//! The one place that talks to the network: a GET with bounded retries.

use reqwest::Client;
use serde_json::Value;
use tracing::{debug, error, info, instrument};

use crate::constants::neis::ERROR_CODE_PREFIX;
use crate::data_fetcher::models::common::upstream_result;
use crate::error::AppError;

use super::retry::{RetryPolicy, with_retries};

/// Performs upstream GETs with the configured retry policy.
#[derive(Debug, Clone)]
pub struct RetryingFetcher {
    client: Client,
    policy: RetryPolicy,
}

impl RetryingFetcher {
    pub fn new(client: Client, policy: RetryPolicy) -> Self {
        Self { client, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Fetches `url` and parses the body as JSON.
    ///
    /// Transport failures and non-2xx statuses are retried with exponential
    /// backoff per the policy; once the attempts are used up the last error
    /// is returned. A 2xx body that is not JSON, or that carries an `ERROR-*`
    /// result code, fails without retrying.
    #[instrument(skip(self, url), fields(url = %redact_key(url)))]
    pub async fn fetch_json(&self, url: &str) -> Result<Value, AppError> {
        let shown = redact_key(url);
        info!("Fetching data from URL: {shown}");
        let body = with_retries(&self.policy, &shown, |_| self.fetch_once(url, &shown)).await?;

        let value = serde_json::from_str::<Value>(&body).map_err(|e| {
            error!("Failed to parse API response: {} (URL: {})", e, shown);
            error!(
                "Response text (first 200 chars): {}",
                body.chars().take(200).collect::<String>()
            );
            AppError::api_malformed_json(e.to_string(), shown.clone())
        })?;

        if let Some((code, message)) = upstream_result(&value)
            && code.starts_with(ERROR_CODE_PREFIX)
        {
            error!("Upstream rejected request with {}: {} (URL: {})", code, message, shown);
            return Err(AppError::api_result(code, message, shown));
        }
        Ok(value)
    }

    async fn fetch_once(&self, url: &str, shown: &str) -> Result<String, AppError> {
        let response = self.client.get(url).send().await.map_err(|e| {
            error!("Request failed for URL {}: {}", shown, e);
            if e.is_timeout() {
                AppError::network_timeout(shown)
            } else if e.is_connect() {
                AppError::network_connection(shown, e.to_string())
            } else {
                AppError::ApiFetch(e)
            }
        })?;

        let status = response.status();
        debug!("Response status: {status}");

        if !status.is_success() {
            let reason = status.canonical_reason().unwrap_or("Unknown error");
            error!("HTTP {} - {} (URL: {})", status.as_u16(), reason, shown);
            return Err(AppError::from_status(status.as_u16(), reason, shown));
        }

        let text = response.text().await.map_err(|e| {
            error!("Failed to read response text from URL {}: {}", shown, e);
            if e.is_timeout() {
                AppError::network_timeout(shown)
            } else {
                AppError::ApiFetch(e)
            }
        })?;
        debug!("Response length: {} bytes", text.len());
        Ok(text)
    }
}

/// Hides the API key value so URLs can go into logs and error messages.
pub fn redact_key(url: &str) -> String {
    let Some(start) = url.find("KEY=") else {
        return url.to_string();
    };
    let value_start = start + "KEY=".len();
    let value_end = url[value_start..]
        .find('&')
        .map_or(url.len(), |offset| value_start + offset);
    format!("{}***{}", &url[..value_start], &url[value_end..])
}
