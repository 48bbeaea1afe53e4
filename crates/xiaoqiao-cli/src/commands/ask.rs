//! The `xiaoqiao ask` command.

use std::path::PathBuf;

use anyhow::Result;

use xiaoqiao_core::advisor::{Advisor, AnswerSource};
use xiaoqiao_core::knowledge::KnowledgeBase;
use xiaoqiao_providers::config::load_config_from;

pub async fn execute(
    question: String,
    knowledge_base: Option<PathBuf>,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let question = question.trim();
    anyhow::ensure!(!question.is_empty(), "question must not be empty");

    let config = load_config_from(config_path.as_deref())?;
    let active = xiaoqiao_providers::connect(&config)?;

    let advisor = match active {
        Some(active) => {
            let advisor = Advisor::new(Some(active.provider), config.advisor_config(active.model));
            let path = knowledge_base.unwrap_or_else(|| config.knowledge_base.clone());
            // the model still answers without background material
            match KnowledgeBase::load(&path) {
                Ok(kb) => advisor.with_knowledge(kb),
                Err(e) => {
                    tracing::warn!("{e:#}, answering without it");
                    advisor
                }
            }
        }
        None => Advisor::new(None, config.advisor_config(config.offline_model())),
    };

    let answer = advisor.chat(question).await;
    if answer.source == AnswerSource::Fallback {
        eprintln!("（离线回答：未配置大模型或调用失败）");
    }
    println!("{}", answer.text);

    Ok(())
}
