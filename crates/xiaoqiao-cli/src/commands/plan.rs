//! The `xiaoqiao plan` command.

use std::path::PathBuf;

use anyhow::Result;
use serde::Serialize;

use xiaoqiao_core::advisor::{Advisor, GeneratedPlan, PlanSource};
use xiaoqiao_core::assessment::AssessmentResult;
use xiaoqiao_core::model::AbilityProfile;
use xiaoqiao_core::plan::{PlanOutcome, TransitionPlan};
use xiaoqiao_core::report::AssessmentReport;
use xiaoqiao_providers::config::load_config_from;

use super::PlanFormat;

#[derive(Serialize)]
struct PlanOutput<'a> {
    profile: &'a AbilityProfile,
    #[serde(flatten)]
    plan: &'a GeneratedPlan,
}

pub async fn execute(
    profile_path: PathBuf,
    duration: String,
    format: PlanFormat,
    config_path: Option<PathBuf>,
) -> Result<()> {
    anyhow::ensure!(!duration.trim().is_empty(), "--duration must not be empty");

    let profile = xiaoqiao_core::parser::parse_profile(&profile_path)?;
    let config = load_config_from(config_path.as_deref())?;

    let active = xiaoqiao_providers::connect(&config)?;
    let (provider, model) = match active {
        Some(active) => (Some(active.provider), active.model),
        None => {
            eprintln!("未配置大模型 API Key，以下为示例计划。");
            (None, config.offline_model())
        }
    };
    let advisor = Advisor::new(provider, config.advisor_config(model));

    let plan = match advisor.generate_plan(&profile, &duration).await {
        Ok(plan) => plan,
        Err(e) => {
            eprintln!("Error: plan generation failed: {e:#}");
            eprintln!("以下为示例计划。");
            sample_plan(advisor.assess(&profile))
        }
    };

    match format {
        PlanFormat::Json => {
            let output = PlanOutput {
                profile: &profile,
                plan: &plan,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        PlanFormat::Markdown => {
            println!("{}", AssessmentReport::new(profile).to_markdown());
            println!("## 幼小衔接计划\n");
            println!("{}", plan.outcome.to_markdown());
        }
    }

    Ok(())
}

fn sample_plan(assessment: AssessmentResult) -> GeneratedPlan {
    GeneratedPlan {
        assessment,
        outcome: PlanOutcome::Structured(TransitionPlan::sample()),
        source: PlanSource::Sample,
    }
}
