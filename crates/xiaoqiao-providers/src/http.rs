//! HTTP plumbing shared by the API providers.

use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use xiaoqiao_core::error::ProviderError;

pub(crate) const DEFAULT_TIMEOUT_SECS: u64 = 120;
const DEFAULT_RETRY_AFTER_SECS: u64 = 5;

pub(crate) fn build_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
        .build()
        .context("failed to build HTTP client")
}

pub(crate) fn transport_error(e: reqwest::Error) -> ProviderError {
    if e.is_timeout() {
        ProviderError::Timeout(DEFAULT_TIMEOUT_SECS)
    } else {
        ProviderError::NetworkError(e.to_string())
    }
}

/// `{"error": {"message": ...}}`, used by both OpenAI and Anthropic.
#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

fn error_message(body: String) -> String {
    serde_json::from_str::<ErrorEnvelope>(&body)
        .map(|e| e.error.message)
        .unwrap_or(body)
}

/// Map a non-success response onto a [`ProviderError`]. Successful
/// responses are passed through.
pub(crate) async fn check_status(
    response: reqwest::Response,
    model: &str,
) -> Result<reqwest::Response, ProviderError> {
    let status = response.status().as_u16();
    if status < 400 {
        return Ok(response);
    }

    match status {
        429 => {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok())
                .unwrap_or(DEFAULT_RETRY_AFTER_SECS)
                .saturating_mul(1000);
            Err(ProviderError::RateLimited {
                retry_after_ms: retry_after,
            })
        }
        401 => {
            let body = response.text().await.unwrap_or_default();
            Err(ProviderError::AuthenticationFailed(error_message(body)))
        }
        404 => Err(ProviderError::ModelNotFound(model.to_string())),
        _ => {
            let body = response.text().await.unwrap_or_default();
            Err(ProviderError::ApiError {
                status,
                message: error_message(body),
            })
        }
    }
}
