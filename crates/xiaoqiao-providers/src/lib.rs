//! xiaoqiao-providers: LLM provider integrations.
//!
//! Implements the `LlmProvider` trait for OpenAI and Anthropic, plus the
//! configuration layer that decides which one (if any) the advisor uses.

pub mod anthropic;
pub mod config;
mod http;
pub mod mock;
pub mod openai;

pub use config::{
    connect, create_provider, llm_enabled, load_config, load_config_from, select_provider,
    ActiveProvider, ProviderConfig, XiaoqiaoConfig,
};
pub use xiaoqiao_core::error::ProviderError;
