//! Mock provider for testing.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use xiaoqiao_core::error::ProviderError;
use xiaoqiao_core::traits::{GenerateRequest, GenerateResponse, LlmProvider, ModelInfo, TokenUsage};

type ErrorFactory = Box<dyn Fn() -> ProviderError + Send + Sync>;

/// When scripted failures fire.
enum FailureMode {
    Never,
    Always(ErrorFactory),
    FirstCalls(u32, ErrorFactory),
}

/// A mock LLM provider for exercising the advisor without real API calls.
///
/// Replies are chosen by the first keyword contained in the prompt, falling
/// back to a default reply.
pub struct MockProvider {
    /// Ordered prompt substring → reply pairs.
    responses: Vec<(String, String)>,
    /// Reply if no keyword matches.
    default_response: String,
    failure: FailureMode,
    call_count: AtomicU32,
    last_request: Mutex<Option<GenerateRequest>>,
}

impl MockProvider {
    /// Create a mock with keyword → reply mappings.
    pub fn new<K, V>(responses: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            responses: responses
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            default_response: "好的。".to_string(),
            failure: FailureMode::Never,
            call_count: AtomicU32::new(0),
            last_request: Mutex::new(None),
        }
    }

    /// Create a mock that always returns the same reply.
    pub fn with_fixed_response(response: &str) -> Self {
        let mut mock = Self::new(Vec::<(String, String)>::new());
        mock.default_response = response.to_string();
        mock
    }

    /// Fail every call with the error built by `make_error`.
    pub fn failing(
        mut self,
        make_error: impl Fn() -> ProviderError + Send + Sync + 'static,
    ) -> Self {
        self.failure = FailureMode::Always(Box::new(make_error));
        self
    }

    /// Fail the first `calls` calls, then answer normally.
    pub fn failing_first(
        mut self,
        calls: u32,
        make_error: impl Fn() -> ProviderError + Send + Sync + 'static,
    ) -> Self {
        self.failure = FailureMode::FirstCalls(calls, Box::new(make_error));
        self
    }

    /// Get the number of calls made to this provider.
    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::Relaxed)
    }

    /// Get the last request made to this provider.
    pub fn last_request(&self) -> Option<GenerateRequest> {
        self.last_request
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

#[async_trait]
impl LlmProvider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    async fn generate(&self, request: &GenerateRequest) -> anyhow::Result<GenerateResponse> {
        let call = self.call_count.fetch_add(1, Ordering::Relaxed) + 1;
        *self
            .last_request
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(request.clone());

        match &self.failure {
            FailureMode::Always(make_error) => return Err(make_error().into()),
            FailureMode::FirstCalls(n, make_error) if call <= *n => {
                return Err(make_error().into())
            }
            _ => {}
        }

        let content = self
            .responses
            .iter()
            .find(|(key, _)| request.prompt.contains(key.as_str()))
            .map(|(_, v)| v.clone())
            .unwrap_or_else(|| self.default_response.clone());

        // rough estimate: four bytes per token
        let prompt_tokens = (request.prompt.len() / 4) as u32;
        let completion_tokens = (content.len() / 4) as u32;

        Ok(GenerateResponse {
            content,
            model: request.model.clone(),
            token_usage: TokenUsage {
                prompt_tokens,
                completion_tokens,
                total_tokens: prompt_tokens + completion_tokens,
                estimated_cost_usd: 0.0,
            },
            latency_ms: 1,
        })
    }

    fn available_models(&self) -> Vec<ModelInfo> {
        vec![ModelInfo {
            id: "mock-model".into(),
            name: "Mock Model".into(),
            provider: "mock".into(),
            max_context: 100_000,
            cost_per_1k_input: 0.0,
            cost_per_1k_output: 0.0,
        }]
    }
}
