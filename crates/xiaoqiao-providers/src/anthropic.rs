//! Anthropic API provider implementation.

use std::time::Instant;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use xiaoqiao_core::error::ProviderError;
use xiaoqiao_core::traits::{GenerateRequest, GenerateResponse, LlmProvider, ModelInfo, TokenUsage};

use crate::http::{build_client, check_status, transport_error};

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const API_VERSION: &str = "2023-06-01";

/// How requests authenticate.
#[derive(Clone)]
pub enum AnthropicAuth {
    /// `x-api-key` header.
    ApiKey(String),
    /// `Authorization: Bearer` header, for gateways issuing auth tokens.
    AuthToken(String),
}

/// Anthropic Messages API provider.
pub struct AnthropicProvider {
    auth: AnthropicAuth,
    base_url: String,
    client: reqwest::Client,
}

impl AnthropicProvider {
    pub fn new(auth: AnthropicAuth, base_url: Option<String>) -> anyhow::Result<Self> {
        Ok(Self {
            auth,
            base_url: base_url
                .map(|u| u.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            client: build_client()?,
        })
    }
}

#[derive(Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    messages: Vec<AnthropicMessage<'a>>,
}

#[derive(Serialize)]
struct AnthropicMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicContent>,
    #[serde(default)]
    usage: AnthropicUsage,
    model: String,
}

#[derive(Deserialize)]
struct AnthropicContent {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize, Default)]
struct AnthropicUsage {
    #[serde(default)]
    input_tokens: u32,
    #[serde(default)]
    output_tokens: u32,
}

#[async_trait]
impl LlmProvider for AnthropicProvider {
    fn name(&self) -> &str {
        "anthropic"
    }

    #[instrument(skip(self, request), fields(model = %request.model))]
    async fn generate(&self, request: &GenerateRequest) -> anyhow::Result<GenerateResponse> {
        let start = Instant::now();

        let body = AnthropicRequest {
            model: &request.model,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            system: request.system_prompt.as_deref(),
            messages: vec![AnthropicMessage {
                role: "user",
                content: &request.prompt,
            }],
        };

        let req = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .header("anthropic-version", API_VERSION)
            .header("content-type", "application/json");
        let req = match &self.auth {
            AnthropicAuth::ApiKey(key) => req.header("x-api-key", key),
            AnthropicAuth::AuthToken(token) => req.bearer_auth(token),
        };

        let response = req.json(&body).send().await.map_err(transport_error)?;
        let response = check_status(response, &request.model).await?;

        let api_response: AnthropicResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;

        let content: String = api_response
            .content
            .into_iter()
            .filter(|block| block.kind == "text")
            .filter_map(|block| block.text)
            .collect();

        let usage = &api_response.usage;
        let total_tokens = usage.input_tokens + usage.output_tokens;
        // Claude Sonnet pricing: $3/$15 per 1M tokens
        let estimated_cost = (f64::from(usage.input_tokens) * 3.0
            + f64::from(usage.output_tokens) * 15.0)
            / 1_000_000.0;

        tracing::debug!(tokens = total_tokens, "anthropic response received");

        Ok(GenerateResponse {
            content,
            model: api_response.model,
            token_usage: TokenUsage {
                prompt_tokens: usage.input_tokens,
                completion_tokens: usage.output_tokens,
                total_tokens,
                estimated_cost_usd: estimated_cost,
            },
            latency_ms: start.elapsed().as_millis() as u64,
        })
    }

    fn available_models(&self) -> Vec<ModelInfo> {
        vec![
            ModelInfo {
                id: "claude-sonnet-4-20250514".into(),
                name: "Claude Sonnet 4".into(),
                provider: "anthropic".into(),
                max_context: 200_000,
                cost_per_1k_input: 0.003,
                cost_per_1k_output: 0.015,
            },
            ModelInfo {
                id: "claude-haiku-4-5-20251001".into(),
                name: "Claude Haiku 4.5".into(),
                provider: "anthropic".into(),
                max_context: 200_000,
                cost_per_1k_input: 0.001,
                cost_per_1k_output: 0.005,
            },
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request() -> GenerateRequest {
        GenerateRequest {
            model: "claude-sonnet-4-20250514".into(),
            prompt: "孩子不想去小学怎么办？".into(),
            system_prompt: Some("你是小桥".into()),
            max_tokens: 1024,
            temperature: 0.7,
        }
    }

    #[tokio::test]
    async fn successful_generation_joins_text_blocks() {
        let server = MockServer::start().await;

        let response_body = serde_json::json!({
            "content": [
                {"type": "text", "text": "可以先参观小学，"},
                {"type": "tool_use", "id": "t1", "name": "noop", "input": {}},
                {"type": "text", "text": "熟悉校园环境。"}
            ],
            "model": "claude-sonnet-4-20250514",
            "usage": {"input_tokens": 50, "output_tokens": 20}
        });

        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .and(header("x-api-key", "test-key"))
            .and(header("anthropic-version", "2023-06-01"))
            .and(body_partial_json(serde_json::json!({"system": "你是小桥"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(&response_body))
            .mount(&server)
            .await;

        let provider =
            AnthropicProvider::new(AnthropicAuth::ApiKey("test-key".into()), Some(server.uri()))
                .unwrap();
        let response = provider.generate(&request()).await.unwrap();
        assert_eq!(response.content, "可以先参观小学，熟悉校园环境。");
        assert_eq!(response.token_usage.prompt_tokens, 50);
        assert_eq!(response.token_usage.completion_tokens, 20);
        assert_eq!(response.token_usage.total_tokens, 70);
    }

    #[tokio::test]
    async fn auth_token_uses_bearer_header() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .and(header("Authorization", "Bearer gateway-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "content": [{"type": "text", "text": "ok"}],
                "model": "claude-sonnet-4-20250514"
            })))
            .mount(&server)
            .await;

        let provider = AnthropicProvider::new(
            AnthropicAuth::AuthToken("gateway-token".into()),
            Some(server.uri()),
        )
        .unwrap();
        let response = provider.generate(&request()).await.unwrap();
        assert_eq!(response.content, "ok");
        assert_eq!(response.token_usage.total_tokens, 0);
    }

    #[tokio::test]
    async fn authentication_failure() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
                "type": "error",
                "error": {"type": "authentication_error", "message": "invalid x-api-key"}
            })))
            .mount(&server)
            .await;

        let provider =
            AnthropicProvider::new(AnthropicAuth::ApiKey("bad-key".into()), Some(server.uri()))
                .unwrap();
        let err = provider.generate(&request()).await.unwrap_err();
        assert_eq!(err.to_string(), "authentication failed: invalid x-api-key");
        assert!(err.downcast_ref::<ProviderError>().unwrap().is_permanent());
    }

    #[tokio::test]
    async fn rate_limiting_reads_retry_after() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "7"))
            .mount(&server)
            .await;

        let provider =
            AnthropicProvider::new(AnthropicAuth::ApiKey("test-key".into()), Some(server.uri()))
                .unwrap();
        let err = provider.generate(&request()).await.unwrap_err();
        let provider_err = err.downcast_ref::<ProviderError>().unwrap();
        assert_eq!(provider_err.retry_after_ms(), Some(7000));
        assert!(!provider_err.is_permanent());
    }

    #[tokio::test]
    async fn rate_limiting_defaults_to_five_seconds() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let provider =
            AnthropicProvider::new(AnthropicAuth::ApiKey("test-key".into()), Some(server.uri()))
                .unwrap();
        let err = provider.generate(&request()).await.unwrap_err();
        assert_eq!(
            err.downcast_ref::<ProviderError>().unwrap().retry_after_ms(),
            Some(5000)
        );
    }

    #[tokio::test]
    async fn rate_limiting_saturates_huge_retry_after() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(429).insert_header("retry-after", "18446744073709552"),
            )
            .mount(&server)
            .await;

        let provider =
            AnthropicProvider::new(AnthropicAuth::ApiKey("test-key".into()), Some(server.uri()))
                .unwrap();
        let err = provider.generate(&request()).await.unwrap_err();
        assert_eq!(
            err.downcast_ref::<ProviderError>().unwrap().retry_after_ms(),
            Some(u64::MAX)
        );
    }

    #[tokio::test]
    async fn bad_request_message_is_extracted() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "type": "error",
                "error": {"type": "invalid_request_error", "message": "max_tokens: too large"}
            })))
            .mount(&server)
            .await;

        let provider =
            AnthropicProvider::new(AnthropicAuth::ApiKey("test-key".into()), Some(server.uri()))
                .unwrap();
        let err = provider.generate(&request()).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "API error (HTTP 400): max_tokens: too large"
        );
    }
}
