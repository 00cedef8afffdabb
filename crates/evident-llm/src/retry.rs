//! Shared HTTP retry loop with exponential backoff

use crate::LlmError;
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Send a request built by `build`, retrying transient failures
///
/// 404 maps to `ModelNotAvailable`, 401/403 to `Unauthorized`; both fail
/// immediately. 429 and other non-success statuses are retried with a
/// 1s, 2s, 4s... backoff.
pub(crate) async fn send_json<T, F>(build: F, max_retries: u32, model: &str) -> Result<T, LlmError>
where
    T: DeserializeOwned,
    F: Fn() -> reqwest::RequestBuilder,
{
    let mut attempts = 0;
    let mut last_error = None;

    while attempts < max_retries.max(1) {
        match build().send().await {
            Ok(response) => {
                let status = response.status();
                if status.is_success() {
                    return response
                        .json::<T>()
                        .await
                        .map_err(|e| LlmError::InvalidResponse(format!("Failed to parse response: {}", e)));
                } else if status == reqwest::StatusCode::NOT_FOUND {
                    return Err(LlmError::ModelNotAvailable(model.to_string()));
                } else if status == reqwest::StatusCode::UNAUTHORIZED
                    || status == reqwest::StatusCode::FORBIDDEN
                {
                    return Err(LlmError::Unauthorized(format!("HTTP {}", status)));
                } else if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                    last_error = Some(LlmError::RateLimitExceeded);
                } else {
                    let error_text = response
                        .text()
                        .await
                        .unwrap_or_else(|_| "Unknown error".to_string());
                    last_error = Some(LlmError::Communication(format!("HTTP {}: {}", status, error_text)));
                }
            }
            Err(e) => {
                last_error = Some(LlmError::Communication(format!("Request failed: {}", e)));
            }
        }

        attempts += 1;
        if attempts < max_retries {
            let delay = Duration::from_secs(2u64.pow(attempts - 1));
            tracing::debug!("Retrying {} after {:?} (attempt {})", model, delay, attempts + 1);
            tokio::time::sleep(delay).await;
        }
    }

    Err(last_error.unwrap_or_else(|| LlmError::Communication("Max retries exceeded".to_string())))
}

/// Build a reqwest client with a request timeout
pub(crate) fn http_client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_default()
}
