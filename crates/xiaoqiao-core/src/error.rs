//! Provider error types.
//!
//! Failures when talking to a language-model backend. Defined in
//! `xiaoqiao-core` so the advisor can downcast an `anyhow::Error` and decide
//! whether to retry without string matching.

use thiserror::Error;

/// Errors that can occur when interacting with an LLM provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The API returned a 429 rate limit response.
    #[error("rate limited, retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    /// Authentication failed (invalid API key or token).
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    /// No credentials were configured for the provider.
    #[error("missing credentials for provider '{0}'")]
    MissingCredentials(String),

    /// The requested model was not found.
    #[error("model not found: {0}")]
    ModelNotFound(String),

    /// The API returned an error response.
    #[error("API error (HTTP {status}): {message}")]
    ApiError { status: u16, message: String },

    /// The response body could not be understood.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// The request timed out.
    #[error("request timed out after {0}s")]
    Timeout(u64),

    /// A network error occurred.
    #[error("network error: {0}")]
    NetworkError(String),
}

impl ProviderError {
    /// Returns `true` if this error is permanent and should not be retried.
    pub fn is_permanent(&self) -> bool {
        matches!(
            self,
            ProviderError::AuthenticationFailed(_)
                | ProviderError::MissingCredentials(_)
                | ProviderError::ModelNotFound(_)
                | ProviderError::ApiError {
                    status: 400..=499,
                    ..
                }
        )
    }

    /// Returns the retry-after delay in milliseconds, if applicable.
    pub fn retry_after_ms(&self) -> Option<u64> {
        match self {
            ProviderError::RateLimited { retry_after_ms } => Some(*retry_after_ms),
            _ => None,
        }
    }
}
