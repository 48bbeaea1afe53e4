//! End-to-end advisor tests using the mock provider.
//!
//! These tests verify that assessment, plan generation and Q&A work together
//! with a real provider implementation behind the trait object.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use xiaoqiao_core::advisor::{Advisor, AdvisorConfig, AnswerSource, PlanSource};
use xiaoqiao_core::assessment::OverallLevel;
use xiaoqiao_core::error::ProviderError;
use xiaoqiao_core::knowledge::KnowledgeBase;
use xiaoqiao_core::model::AbilityProfile;
use xiaoqiao_core::plan::PlanOutcome;
use xiaoqiao_core::traits::LlmProvider;
use xiaoqiao_providers::mock::MockProvider;

const PLAN_REPLY: &str = r#"```json
{
  "duration": "3个月",
  "weekly_goals": ["调整作息", "练习自己整理书包", "亲子阅读", "模拟课堂"],
  "daily_activities": [
    {"time": "早晨", "activity": "自己穿衣洗漱", "goal": "自理能力"}
  ],
  "resources": ["绘本《我上小学了》"],
  "parent_tips": ["多鼓励、少包办"],
  "evaluation_criteria": ["能在10分钟内整理好书包"]
}
```"#;

fn xiaoming() -> AbilityProfile {
    AbilityProfile::from_value(&json!({
        "name": "小明",
        "age": 5.5,
        "language": {"listening": 4, "expression": 5, "reading": 3, "writing_interest": 3},
        "math": {"counting": 5, "operation": 3, "shapes": 4, "space": 3},
        "social": 4,
        "self_care": 2,
        "motor": 3,
        "interests": ["画画", "积木"],
        "concerns": ["注意力"]
    }))
}

fn config() -> AdvisorConfig {
    AdvisorConfig {
        model: "mock-model".into(),
        retry_delay: Duration::from_millis(1),
        ..AdvisorConfig::default()
    }
}

fn advisor(mock: &Arc<MockProvider>) -> Advisor {
    let provider: Arc<dyn LlmProvider> = mock.clone();
    Advisor::new(Some(provider), config())
}

#[tokio::test]
async fn plan_from_fenced_model_reply() {
    let mock = Arc::new(MockProvider::new([("幼小衔接计划", PLAN_REPLY)]));
    let plan = advisor(&mock).generate_plan(&xiaoming(), "3个月").await.unwrap();

    assert_eq!(plan.source, PlanSource::Model);
    assert_eq!(plan.assessment.overall_level, OverallLevel::Good);
    assert_eq!(plan.assessment.areas_to_improve, vec!["自理能力"]);

    let PlanOutcome::Structured(structured) = &plan.outcome else {
        panic!("expected structured plan, got {:?}", plan.outcome);
    };
    assert_eq!(structured.weekly_goals.len(), 4);
    assert_eq!(structured.daily_activities[0].goal, "自理能力");

    let request = mock.last_request().unwrap();
    assert_eq!(request.model, "mock-model");
    assert!(request.prompt.contains("自理能力：2/5"));
    assert!(request.prompt.contains("需加强：自理能力"));
    assert!(request.prompt.contains("家长担忧：注意力"));
}

#[tokio::test]
async fn plan_prose_reply_is_kept_raw() {
    let mock = Arc::new(MockProvider::with_fixed_response("建议每天坚持阅读二十分钟。"));
    let plan = advisor(&mock).generate_plan(&xiaoming(), "1个月").await.unwrap();
    assert_eq!(
        plan.outcome,
        PlanOutcome::Raw("建议每天坚持阅读二十分钟。".into())
    );
}

#[tokio::test]
async fn plan_recovers_after_transient_failures() {
    let mock = Arc::new(
        MockProvider::with_fixed_response(PLAN_REPLY)
            .failing_first(2, || ProviderError::RateLimited { retry_after_ms: 1 }),
    );
    let plan = advisor(&mock).generate_plan(&xiaoming(), "3个月").await.unwrap();
    assert!(matches!(plan.outcome, PlanOutcome::Structured(_)));
    assert_eq!(mock.call_count(), 3);
}

#[tokio::test]
async fn plan_gives_up_after_max_retries() {
    let mock = Arc::new(
        MockProvider::with_fixed_response(PLAN_REPLY).failing(|| ProviderError::Timeout(120)),
    );
    let err = advisor(&mock)
        .generate_plan(&xiaoming(), "3个月")
        .await
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<ProviderError>(),
        Some(ProviderError::Timeout(120))
    ));
    // first attempt plus the default two retries
    assert_eq!(mock.call_count(), 3);
}

#[tokio::test]
async fn chat_uses_model_with_knowledge() {
    let mock = Arc::new(MockProvider::new([("拼音", "可以通过拼音游戏增加熟悉度。")]));
    let kb = KnowledgeBase::from_text(
        "## 拼音\n\n入学前不建议系统学习拼音，可以用儿歌和游戏熟悉声母韵母。",
    );
    let advisor = advisor(&mock).with_knowledge(kb);

    let answer = advisor.chat("需要提前学拼音吗？").await;
    assert_eq!(answer.source, AnswerSource::Model);
    assert_eq!(answer.text, "可以通过拼音游戏增加熟悉度。");

    let system = mock.last_request().unwrap().system_prompt.unwrap();
    assert!(system.contains("用儿歌和游戏熟悉声母韵母"));
}

#[tokio::test]
async fn chat_falls_back_when_provider_rejects_credentials() {
    let mock = Arc::new(
        MockProvider::with_fixed_response("unused")
            .failing(|| ProviderError::AuthenticationFailed("invalid key".into())),
    );
    let answer = advisor(&mock).chat("如何培养时间观念？").await;

    assert_eq!(answer.source, AnswerSource::Fallback);
    assert!(answer.text.contains("可视化计时器"));
    assert_eq!(mock.call_count(), 1);
}
