//! Configuration loading, provider selection and factory.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use xiaoqiao_core::advisor::AdvisorConfig;
use xiaoqiao_core::error::ProviderError;
use xiaoqiao_core::traits::LlmProvider;

use crate::anthropic::{AnthropicAuth, AnthropicProvider};
use crate::openai::OpenAiProvider;

const DEFAULT_OPENAI_MODEL: &str = "gpt-4o";
const DEFAULT_ANTHROPIC_MODEL: &str = "claude-sonnet-4-20250514";

/// Configuration for a single LLM provider.
///
/// Note: Custom Debug impl masks secrets to prevent accidental exposure in logs.
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ProviderConfig {
    OpenAI {
        #[serde(default)]
        api_key: String,
        #[serde(default)]
        base_url: Option<String>,
        #[serde(default)]
        org_id: Option<String>,
        /// Overrides the top-level `default_model` for this provider.
        #[serde(default)]
        model: Option<String>,
    },
    Anthropic {
        #[serde(default)]
        api_key: String,
        /// Bearer token; used only when `api_key` is empty.
        #[serde(default)]
        auth_token: String,
        #[serde(default)]
        base_url: Option<String>,
        #[serde(default)]
        model: Option<String>,
    },
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        fn mask(secret: &str) -> &'static str {
            if secret.is_empty() {
                ""
            } else {
                "***"
            }
        }

        match self {
            ProviderConfig::OpenAI {
                api_key,
                base_url,
                org_id,
                model,
            } => f
                .debug_struct("OpenAI")
                .field("api_key", &mask(api_key))
                .field("base_url", base_url)
                .field("org_id", org_id)
                .field("model", model)
                .finish(),
            ProviderConfig::Anthropic {
                api_key,
                auth_token,
                base_url,
                model,
            } => f
                .debug_struct("Anthropic")
                .field("api_key", &mask(api_key))
                .field("auth_token", &mask(auth_token))
                .field("base_url", base_url)
                .field("model", model)
                .finish(),
        }
    }
}

impl ProviderConfig {
    fn empty_openai() -> Self {
        ProviderConfig::OpenAI {
            api_key: String::new(),
            base_url: None,
            org_id: None,
            model: None,
        }
    }

    fn empty_anthropic() -> Self {
        ProviderConfig::Anthropic {
            api_key: String::new(),
            auth_token: String::new(),
            base_url: None,
            model: None,
        }
    }

    /// Whether a request could authenticate.
    pub fn has_credentials(&self) -> bool {
        match self {
            ProviderConfig::OpenAI { api_key, .. } => !api_key.trim().is_empty(),
            ProviderConfig::Anthropic {
                api_key,
                auth_token,
                ..
            } => !api_key.trim().is_empty() || !auth_token.trim().is_empty(),
        }
    }

    /// Provider-level model override.
    pub fn model(&self) -> Option<&str> {
        match self {
            ProviderConfig::OpenAI { model, .. } | ProviderConfig::Anthropic { model, .. } => {
                model.as_deref().filter(|m| !m.trim().is_empty())
            }
        }
    }

    fn fallback_model(&self) -> &'static str {
        match self {
            ProviderConfig::OpenAI { .. } => DEFAULT_OPENAI_MODEL,
            ProviderConfig::Anthropic { .. } => DEFAULT_ANTHROPIC_MODEL,
        }
    }
}

/// Top-level xiaoqiao configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct XiaoqiaoConfig {
    /// Provider configurations keyed by name.
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
    /// Provider preferred when it has credentials.
    #[serde(default = "default_provider")]
    pub default_provider: String,
    /// Model used with the default provider. Unset means that provider's
    /// own default.
    #[serde(default)]
    pub default_model: Option<String>,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Max retries on transient provider errors.
    #[serde(default = "default_retries")]
    pub max_retries: u32,
    /// Delay before the first retry in milliseconds.
    #[serde(default = "default_retry_delay")]
    pub retry_delay_ms: u64,
    /// Markdown document used to ground Q&A.
    #[serde(default = "default_knowledge_base")]
    pub knowledge_base: PathBuf,
    /// Knowledge chunks retrieved per question.
    #[serde(default = "default_retrieval_k")]
    pub retrieval_k: usize,
    /// Output directory for saved reports.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

fn default_provider() -> String {
    "openai".to_string()
}
fn default_temperature() -> f64 {
    0.7
}
fn default_max_tokens() -> u32 {
    1024
}
fn default_retries() -> u32 {
    2
}
fn default_retry_delay() -> u64 {
    1000
}
fn default_knowledge_base() -> PathBuf {
    PathBuf::from("knowledge_base.md")
}
fn default_retrieval_k() -> usize {
    3
}
fn default_output_dir() -> PathBuf {
    PathBuf::from("./xiaoqiao-results")
}

impl Default for XiaoqiaoConfig {
    fn default() -> Self {
        Self {
            providers: HashMap::new(),
            default_provider: default_provider(),
            default_model: None,
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            max_retries: default_retries(),
            retry_delay_ms: default_retry_delay(),
            knowledge_base: default_knowledge_base(),
            retrieval_k: default_retrieval_k(),
            output_dir: default_output_dir(),
        }
    }
}

impl XiaoqiaoConfig {
    /// Model to request from the named provider.
    pub fn model_for(&self, name: &str, provider: &ProviderConfig) -> String {
        provider
            .model()
            .or_else(|| {
                (name == self.default_provider)
                    .then_some(self.default_model.as_deref())
                    .flatten()
            })
            .unwrap_or_else(|| provider.fallback_model())
            .to_string()
    }

    /// Model named in settings when no provider is selected.
    pub fn offline_model(&self) -> String {
        self.default_model
            .clone()
            .unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_string())
    }

    /// Advisor settings for `model`.
    pub fn advisor_config(&self, model: String) -> AdvisorConfig {
        AdvisorConfig {
            model,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            max_retries: self.max_retries,
            retry_delay: Duration::from_millis(self.retry_delay_ms),
            retrieval_k: self.retrieval_k,
        }
    }
}

/// Resolve environment variable references like `${VAR_NAME}` in a string.
fn resolve_env_vars(s: &str) -> String {
    substitute_vars(s, |name| std::env::var(name).ok())
}

/// Replace each `${NAME}` with `lookup(NAME)` (empty when unset). Inserted
/// values are not rescanned.
fn substitute_vars(s: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let mut result = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(start) = rest.find("${") {
        let Some(len) = rest[start..].find('}') else {
            break;
        };
        result.push_str(&rest[..start]);
        let var_name = &rest[start + 2..start + len];
        result.push_str(&lookup(var_name).unwrap_or_default());
        rest = &rest[start + len + 1..];
    }
    result.push_str(rest);
    result
}

/// Resolve env vars in a provider config.
fn resolve_provider_config(config: &ProviderConfig) -> ProviderConfig {
    let opt = |v: &Option<String>| v.as_deref().map(resolve_env_vars);
    match config {
        ProviderConfig::OpenAI {
            api_key,
            base_url,
            org_id,
            model,
        } => ProviderConfig::OpenAI {
            api_key: resolve_env_vars(api_key),
            base_url: opt(base_url),
            org_id: opt(org_id),
            model: opt(model),
        },
        ProviderConfig::Anthropic {
            api_key,
            auth_token,
            base_url,
            model,
        } => ProviderConfig::Anthropic {
            api_key: resolve_env_vars(api_key),
            auth_token: resolve_env_vars(auth_token),
            base_url: opt(base_url),
            model: opt(model),
        },
    }
}

/// Apply the conventional environment variables on top of a loaded config.
/// Empty values are treated as unset.
fn apply_env_overrides(config: &mut XiaoqiaoConfig, lookup: impl Fn(&str) -> Option<String>) {
    let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

    let openai_vars = (
        var("OPENAI_API_KEY"),
        var("OPENAI_BASE_URL"),
        var("OPENAI_MODEL"),
    );
    if openai_vars.0.is_some() || openai_vars.1.is_some() || openai_vars.2.is_some() {
        let entry = config
            .providers
            .entry("openai".into())
            .or_insert_with(ProviderConfig::empty_openai);
        if let ProviderConfig::OpenAI {
            api_key,
            base_url,
            model,
            ..
        } = entry
        {
            let (key, url, name) = openai_vars;
            if let Some(key) = key {
                *api_key = key;
            }
            if url.is_some() {
                *base_url = url;
            }
            if name.is_some() {
                *model = name;
            }
        }
    }

    let anthropic_vars = (
        var("ANTHROPIC_API_KEY"),
        var("ANTHROPIC_AUTH_TOKEN"),
        var("ANTHROPIC_BASE_URL"),
        var("ANTHROPIC_MODEL"),
    );
    if anthropic_vars.0.is_some()
        || anthropic_vars.1.is_some()
        || anthropic_vars.2.is_some()
        || anthropic_vars.3.is_some()
    {
        let entry = config
            .providers
            .entry("anthropic".into())
            .or_insert_with(ProviderConfig::empty_anthropic);
        if let ProviderConfig::Anthropic {
            api_key,
            auth_token,
            base_url,
            model,
        } = entry
        {
            let (key, token, url, name) = anthropic_vars;
            if let Some(key) = key {
                *api_key = key;
            }
            if let Some(token) = token {
                *auth_token = token;
            }
            if url.is_some() {
                *base_url = url;
            }
            if name.is_some() {
                *model = name;
            }
        }
    }

    if let Some(path) = var("KNOWLEDGE_BASE_PATH") {
        config.knowledge_base = PathBuf::from(path);
    }
}

/// Load configuration from well-known paths.
///
/// Search order:
/// 1. `xiaoqiao.toml` in the current directory
/// 2. `~/.config/xiaoqiao/config.toml`
///
/// Environment variable overrides: `OPENAI_API_KEY`, `OPENAI_BASE_URL`,
/// `OPENAI_MODEL`, `ANTHROPIC_API_KEY`, `ANTHROPIC_AUTH_TOKEN`,
/// `ANTHROPIC_BASE_URL`, `ANTHROPIC_MODEL`, `KNOWLEDGE_BASE_PATH`.
pub fn load_config() -> Result<XiaoqiaoConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_config_from(path: Option<&Path>) -> Result<XiaoqiaoConfig> {
    let config_path = if let Some(p) = path {
        if p.exists() {
            Some(p.to_path_buf())
        } else {
            anyhow::bail!("config file not found: {}", p.display());
        }
    } else {
        let local = PathBuf::from("xiaoqiao.toml");
        if local.exists() {
            Some(local)
        } else {
            dirs_path()
                .map(|dir| dir.join("config.toml"))
                .filter(|global| global.exists())
        }
    };

    let mut config = match &config_path {
        Some(path) => parse_config_file(path)?,
        None => XiaoqiaoConfig::default(),
    };
    if let Some(path) = &config_path {
        tracing::debug!(path = %path.display(), "loaded config");
    }

    apply_env_overrides(&mut config, |name| std::env::var(name).ok());

    config.providers = config
        .providers
        .iter()
        .map(|(k, v)| (k.clone(), resolve_provider_config(v)))
        .collect();

    Ok(config)
}

fn parse_config_file(path: &Path) -> Result<XiaoqiaoConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config: {}", path.display()))?;
    toml::from_str::<XiaoqiaoConfig>(&content)
        .with_context(|| format!("failed to parse config: {}", path.display()))
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("xiaoqiao"))
}

/// Pick the provider to use: the default provider if it has credentials,
/// then `openai`, then `anthropic`, then any other provider with credentials
/// (by name).
pub fn select_provider(config: &XiaoqiaoConfig) -> Option<(&str, &ProviderConfig)> {
    let usable = move |name: &str| {
        config
            .providers
            .get_key_value(name)
            .filter(|(_, p)| p.has_credentials())
            .map(|(k, p)| (k.as_str(), p))
    };

    usable(config.default_provider.as_str())
        .or_else(|| usable("openai"))
        .or_else(|| usable("anthropic"))
        .or_else(|| {
            let mut names: Vec<&String> = config.providers.keys().collect();
            names.sort();
            names.into_iter().find_map(|name| usable(name.as_str()))
        })
}

/// Whether any configured provider could be used.
pub fn llm_enabled(config: &XiaoqiaoConfig) -> bool {
    select_provider(config).is_some()
}

/// Create a provider instance from its configuration.
pub fn create_provider(name: &str, config: &ProviderConfig) -> Result<Box<dyn LlmProvider>> {
    if !config.has_credentials() {
        return Err(ProviderError::MissingCredentials(name.to_string()).into());
    }

    match config {
        ProviderConfig::OpenAI {
            api_key,
            base_url,
            org_id,
            ..
        } => Ok(Box::new(OpenAiProvider::new(
            api_key.trim(),
            base_url.clone(),
            org_id.clone(),
        )?)),
        ProviderConfig::Anthropic {
            api_key,
            auth_token,
            base_url,
            ..
        } => {
            let auth = if api_key.trim().is_empty() {
                AnthropicAuth::AuthToken(auth_token.trim().to_string())
            } else {
                AnthropicAuth::ApiKey(api_key.trim().to_string())
            };
            Ok(Box::new(AnthropicProvider::new(auth, base_url.clone())?))
        }
    }
}

/// The provider the advisor should talk to.
pub struct ActiveProvider {
    pub name: String,
    pub model: String,
    pub provider: Arc<dyn LlmProvider>,
}

/// Select and build the provider for `config`. `Ok(None)` means no provider
/// has credentials and the advisor should run offline.
pub fn connect(config: &XiaoqiaoConfig) -> Result<Option<ActiveProvider>> {
    let Some((name, provider_config)) = select_provider(config) else {
        tracing::info!("no LLM credentials configured, running offline");
        return Ok(None);
    };

    let model = config.model_for(name, provider_config);
    let provider = create_provider(name, provider_config)
        .with_context(|| format!("failed to create provider '{name}'"))?;
    tracing::info!(provider = name, model = %model, "using language model");

    Ok(Some(ActiveProvider {
        name: name.to_string(),
        model,
        provider: Arc::from(provider),
    }))
}
