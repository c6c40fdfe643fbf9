// Render driver - HTTP orchestration of the plot endpoint
use std::time::Duration;

use log::warn;
use thiserror::Error;

use crate::constants;
use crate::plot::{PlotArtifact, PlotRequest};

/// Terminal orchestration failures
///
/// Transient conditions (connect errors, deadlines, 5xx responses) are
/// retried up to the configured bound before one of these is produced;
/// `NoData` and `Rejected` are never retried.
#[derive(Debug, Error)]
pub enum OrchestrationError {
    #[error("no history records for the requested range")]
    NoData,

    #[error("render request rejected: {0}")]
    Rejected(String),

    #[error("render call exceeded its deadline on all {attempts} attempts")]
    Timeout { attempts: usize },

    #[error("render failed after {attempts} attempts: {last}")]
    Failed { attempts: usize, last: String },

    #[error("unexpected renderer response: {0}")]
    BadResponse(String),

    #[error("http client setup failed: {0}")]
    Client(String),
}

/// The entry point operators call: invokes the render endpoint over the
/// network with a timeout and a small number of retries
pub struct RenderDriver {
    client: reqwest::Client,
    base_url: String,
    max_attempts: usize,
}

impl RenderDriver {
    pub fn new(base_url: impl Into<String>) -> Result<Self, OrchestrationError> {
        Self::with_policy(
            base_url,
            Duration::from_secs(constants::RENDER_TIMEOUT_SECS),
            constants::DRIVER_MAX_ATTEMPTS,
        )
    }

    pub fn with_policy(
        base_url: impl Into<String>,
        timeout: Duration,
        max_attempts: usize,
    ) -> Result<Self, OrchestrationError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(constants::user_agent())
            .build()
            .map_err(|e| OrchestrationError::Client(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            max_attempts: max_attempts.max(1),
        })
    }

    /// Trigger a render and wait for the artifact reference
    ///
    /// Never returns a partial result: either the published artifact's
    /// reference or a terminal error with the last observed failure.
    pub async fn trigger_render(
        &self,
        request: &PlotRequest,
    ) -> Result<PlotArtifact, OrchestrationError> {
        let url = format!("{}/plot", self.base_url);
        let mut params: Vec<(&str, String)> = Vec::new();
        if let Some(bucket) = &request.bucket {
            params.push(("bucket", bucket.clone()));
        }
        if let Some(start) = request.start {
            params.push(("start", start.to_string()));
        }
        if let Some(end) = request.end {
            params.push(("end", end.to_string()));
        }

        let mut backoff = Duration::from_millis(constants::DRIVER_BACKOFF_BASE_MS);
        let mut last_err = String::new();
        let mut last_was_timeout = false;

        for attempt in 1..=self.max_attempts {
            match self.client.get(&url).query(&params).send().await {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return response
                            .json::<PlotArtifact>()
                            .await
                            .map_err(|e| OrchestrationError::BadResponse(e.to_string()));
                    }

                    let body = response.text().await.unwrap_or_default();
                    let detail = error_detail(&body).unwrap_or_else(|| status.to_string());

                    if status == reqwest::StatusCode::NOT_FOUND {
                        return Err(OrchestrationError::NoData);
                    }
                    if status.is_client_error() {
                        return Err(OrchestrationError::Rejected(detail));
                    }

                    // 5xx-class: transient, worth another attempt
                    last_err = format!("{}: {}", status, detail);
                    last_was_timeout = false;
                }
                Err(e) => {
                    last_was_timeout = e.is_timeout();
                    last_err = e.to_string();
                }
            }

            if attempt < self.max_attempts {
                warn!(
                    "render call failed (attempt {}/{}): {}, retrying in {:?}",
                    attempt, self.max_attempts, last_err, backoff
                );
                tokio::time::sleep(backoff).await;
                backoff *= 2;
            }
        }

        if last_was_timeout {
            Err(OrchestrationError::Timeout {
                attempts: self.max_attempts,
            })
        } else {
            Err(OrchestrationError::Failed {
                attempts: self.max_attempts,
                last: last_err,
            })
        }
    }
}

/// Pull `error.code` / `error.message` out of an error response body
fn error_detail(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    let error = value.get("error")?;
    let code = error.get("code")?.as_str()?;
    match error.get("message").and_then(|m| m.as_str()) {
        Some(message) => Some(format!("{}: {}", code, message)),
        None => Some(code.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_detail_parsing() {
        assert_eq!(
            error_detail(r#"{"error":{"code":"no_data","message":"nothing there"}}"#),
            Some("no_data: nothing there".to_string())
        );
        assert_eq!(
            error_detail(r#"{"error":{"code":"invalid_range"}}"#),
            Some("invalid_range".to_string())
        );
        assert_eq!(error_detail("plain text"), None);
    }

    #[test]
    fn test_base_url_is_normalized() {
        let driver = RenderDriver::new("http://localhost:9999/").unwrap();
        assert_eq!(driver.base_url, "http://localhost:9999");
    }
}
