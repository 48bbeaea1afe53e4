//! Orchestrator tying the assessment engine, the knowledge base and an
//! optional language model together.
//!
//! Everything degrades gracefully: without a provider the advisor still
//! assesses, returns the sample plan, and answers from the static Q&A table.

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use serde::Serialize;

use crate::assessment::{calculate_assessment, AssessmentResult};
use crate::error::ProviderError;
use crate::knowledge::KnowledgeBase;
use crate::model::AbilityProfile;
use crate::plan::{build_plan_prompt, parse_plan_response, PlanOutcome, TransitionPlan};
use crate::qa::{build_chat_system_prompt, local_answer};
use crate::traits::{GenerateRequest, GenerateResponse, LlmProvider};

const MAX_RETRY_DELAY: Duration = Duration::from_secs(60);

/// Generation settings for the advisor.
#[derive(Debug, Clone)]
pub struct AdvisorConfig {
    /// Model identifier passed to the provider.
    pub model: String,
    pub temperature: f64,
    pub max_tokens: u32,
    /// Retries on transient provider errors.
    pub max_retries: u32,
    /// Delay before the first retry; doubles each time.
    pub retry_delay: Duration,
    /// Knowledge chunks injected into a chat prompt.
    pub retrieval_k: usize,
}

impl Default for AdvisorConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            temperature: 0.7,
            max_tokens: 1024,
            max_retries: 2,
            retry_delay: Duration::from_secs(1),
            retrieval_k: 3,
        }
    }
}

/// Where a plan came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanSource {
    Model,
    Sample,
}

/// An assessment together with the plan built on it.
#[derive(Debug, Clone, Serialize)]
pub struct GeneratedPlan {
    pub assessment: AssessmentResult,
    pub outcome: PlanOutcome,
    pub source: PlanSource,
}

/// Where an answer came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerSource {
    Model,
    Fallback,
}

#[derive(Debug, Clone, Serialize)]
pub struct Answer {
    pub text: String,
    pub source: AnswerSource,
}

pub struct Advisor {
    provider: Option<Arc<dyn LlmProvider>>,
    knowledge: Option<KnowledgeBase>,
    config: AdvisorConfig,
}

impl Advisor {
    pub fn new(provider: Option<Arc<dyn LlmProvider>>, config: AdvisorConfig) -> Self {
        Self {
            provider,
            knowledge: None,
            config,
        }
    }

    /// Attach a knowledge base used to ground chat answers.
    pub fn with_knowledge(mut self, knowledge: KnowledgeBase) -> Self {
        self.knowledge = Some(knowledge);
        self
    }

    pub fn llm_enabled(&self) -> bool {
        self.provider.is_some()
    }

    pub fn config(&self) -> &AdvisorConfig {
        &self.config
    }

    pub fn assess(&self, profile: &AbilityProfile) -> AssessmentResult {
        calculate_assessment(profile)
    }

    /// Assess the child and generate a transition plan.
    ///
    /// Without a provider the sample plan is returned. With one, the
    /// provider error is returned once retries are exhausted; the caller
    /// decides whether to fall back.
    pub async fn generate_plan(
        &self,
        profile: &AbilityProfile,
        duration: &str,
    ) -> Result<GeneratedPlan> {
        let assessment = calculate_assessment(profile);

        let Some(provider) = &self.provider else {
            tracing::debug!("no provider configured, using sample plan");
            return Ok(GeneratedPlan {
                assessment,
                outcome: PlanOutcome::Structured(TransitionPlan::sample()),
                source: PlanSource::Sample,
            });
        };

        let request = GenerateRequest {
            model: self.config.model.clone(),
            prompt: build_plan_prompt(profile, &assessment, duration),
            system_prompt: None,
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
        };

        let response = self.generate_with_retry(provider.as_ref(), &request).await?;
        let outcome = parse_plan_response(&response.content);
        if matches!(outcome, PlanOutcome::Raw(_)) {
            tracing::warn!("model reply was not a structured plan, showing it verbatim");
        }

        Ok(GeneratedPlan {
            assessment,
            outcome,
            source: PlanSource::Model,
        })
    }

    /// Answer a parent's question. Never fails: any provider problem falls
    /// back to the static answer table.
    pub async fn chat(&self, question: &str) -> Answer {
        let Some(provider) = &self.provider else {
            return fallback_answer(question);
        };

        let knowledge = self
            .knowledge
            .as_ref()
            .map(|kb| kb.retrieve(question, self.config.retrieval_k))
            .unwrap_or_default();

        let request = GenerateRequest {
            model: self.config.model.clone(),
            prompt: question.to_string(),
            system_prompt: Some(build_chat_system_prompt(&knowledge)),
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
        };

        match self.generate_with_retry(provider.as_ref(), &request).await {
            Ok(response) => Answer {
                text: response.content,
                source: AnswerSource::Model,
            },
            Err(e) => {
                tracing::warn!("chat request failed, answering from local table: {e:#}");
                fallback_answer(question)
            }
        }
    }

    /// Call the provider, retrying transient failures with exponential
    /// backoff. Permanent errors return immediately.
    async fn generate_with_retry(
        &self,
        provider: &dyn LlmProvider,
        request: &GenerateRequest,
    ) -> Result<GenerateResponse> {
        let start = Instant::now();
        let mut delay = self.config.retry_delay;
        let mut last_error = None;

        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                tokio::time::sleep(delay).await;
                delay = (delay * 2).min(MAX_RETRY_DELAY);
            }

            match provider.generate(request).await {
                Ok(response) => {
                    tracing::info!(
                        provider = provider.name(),
                        model = %response.model,
                        attempts = attempt + 1,
                        elapsed_ms = start.elapsed().as_millis() as u64,
                        "generation complete"
                    );
                    return Ok(response);
                }
                Err(e) => {
                    if let Some(provider_err) = e.downcast_ref::<ProviderError>() {
                        if provider_err.is_permanent() {
                            return Err(e);
                        }
                        if let Some(ms) = provider_err.retry_after_ms() {
                            delay = Duration::from_millis(ms).min(MAX_RETRY_DELAY);
                        }
                    }
                    tracing::debug!(attempt, "provider call failed: {e:#}");
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| anyhow::anyhow!("no generation attempt was made")))
    }
}

fn fallback_answer(question: &str) -> Answer {
    Answer {
        text: local_answer(question).to_string(),
        source: AnswerSource::Fallback,
    }
}
