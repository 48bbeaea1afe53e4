//! Transition plan model, prompt construction, and response parsing.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::assessment::AssessmentResult;
use crate::model::AbilityProfile;

/// Plan length used when the caller does not pick one.
pub const DEFAULT_DURATION: &str = "3个月";

/// A structured kindergarten-to-primary transition plan.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransitionPlan {
    pub duration: String,
    pub weekly_goals: Vec<String>,
    pub daily_activities: Vec<DailyActivity>,
    pub resources: Vec<String>,
    pub parent_tips: Vec<String>,
    pub evaluation_criteria: Vec<String>,
}

/// One row of the daily schedule.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DailyActivity {
    pub time: String,
    pub activity: String,
    pub goal: String,
}

impl DailyActivity {
    fn new(time: &str, activity: &str, goal: &str) -> Self {
        Self {
            time: time.into(),
            activity: activity.into(),
            goal: goal.into(),
        }
    }
}

impl TransitionPlan {
    /// The built-in example plan shown when no language model is configured.
    pub fn sample() -> Self {
        Self {
            duration: "4周".into(),
            weekly_goals: vec![
                "第一周：习惯养成".into(),
                "第二周：能力提升".into(),
                "第三周：综合训练".into(),
                "第四周：巩固强化".into(),
            ],
            daily_activities: vec![
                DailyActivity::new("早晨", "亲子阅读15分钟", "语言发展"),
                DailyActivity::new("下午", "益智游戏", "数学思维"),
                DailyActivity::new("傍晚", "户外运动30分钟", "体能发展"),
                DailyActivity::new("睡前", "整理书包", "自理能力"),
            ],
            resources: Vec::new(),
            parent_tips: vec![
                "每天坚持，形成习惯".into(),
                "多鼓励、少批评".into(),
                "保持耐心，循序渐进".into(),
                "定期回顾调整".into(),
            ],
            evaluation_criteria: Vec::new(),
        }
    }

    /// Render as markdown. Empty sections are omitted.
    pub fn to_markdown(&self) -> String {
        let mut md = String::new();

        if !self.duration.is_empty() {
            md.push_str(&format!("**周期：** {}\n\n", self.duration));
        }

        push_list(&mut md, "每周重点目标", &self.weekly_goals);

        if !self.daily_activities.is_empty() {
            md.push_str("### 每日推荐活动\n\n");
            md.push_str("| 时间 | 活动 | 目标 |\n");
            md.push_str("|------|------|------|\n");
            for a in &self.daily_activities {
                md.push_str(&format!(
                    "| {} | {} | {} |\n",
                    cell(&a.time),
                    cell(&a.activity),
                    cell(&a.goal)
                ));
            }
            md.push('\n');
        }

        push_list(&mut md, "推荐资源", &self.resources);
        push_list(&mut md, "家长注意事项", &self.parent_tips);
        push_list(&mut md, "评估标准", &self.evaluation_criteria);

        md
    }
}

fn push_list(md: &mut String, heading: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    md.push_str(&format!("### {heading}\n\n"));
    for item in items {
        md.push_str(&format!("- {item}\n"));
    }
    md.push('\n');
}

fn cell(s: &str) -> String {
    s.replace('|', "\\|").replace('\n', " ")
}

/// What came back from the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "content", rename_all = "snake_case")]
pub enum PlanOutcome {
    /// The reply contained a plan object.
    Structured(TransitionPlan),
    /// The reply could not be read as a plan; shown verbatim.
    Raw(String),
}

impl PlanOutcome {
    pub fn to_markdown(&self) -> String {
        match self {
            PlanOutcome::Structured(plan) => plan.to_markdown(),
            PlanOutcome::Raw(text) => text.clone(),
        }
    }
}

/// Interpret a model reply as a plan.
///
/// The whole reply is tried as JSON first; failing that, the span from the
/// first `{` or `[` to the last matching closer (which also covers fenced
/// code blocks and surrounding prose). Only a JSON object whose fields have
/// the expected shapes becomes [`PlanOutcome::Structured`].
pub fn parse_plan_response(text: &str) -> PlanOutcome {
    let value = serde_json::from_str::<Value>(text.trim())
        .ok()
        .or_else(|| json_span(text).and_then(|span| serde_json::from_str(span).ok()));

    match value {
        Some(value @ Value::Object(_)) => match serde_json::from_value(value) {
            Ok(plan) => PlanOutcome::Structured(plan),
            Err(e) => {
                tracing::debug!("plan JSON has unexpected shape: {e}");
                PlanOutcome::Raw(text.to_string())
            }
        },
        _ => PlanOutcome::Raw(text.to_string()),
    }
}

fn json_span(text: &str) -> Option<&str> {
    let start = text.find(['{', '['])?;
    let closer = if text[start..].starts_with('{') { '}' } else { ']' };
    let end = text.rfind(closer)?;
    (end > start).then(|| &text[start..=end])
}

/// Build the plan-generation prompt for a child and their assessment.
pub fn build_plan_prompt(
    profile: &AbilityProfile,
    assessment: &AssessmentResult,
    duration: &str,
) -> String {
    let age = profile
        .age
        .map(|a| a.to_string())
        .unwrap_or_else(|| "未知".to_string());
    let lang = &profile.language;
    let math = &profile.math;

    let strengths = if assessment.strengths.is_empty() {
        "暂无明显优势".to_string()
    } else {
        assessment.strengths.join(", ")
    };
    let areas = if assessment.areas_to_improve.is_empty() {
        "暂无明显不足".to_string()
    } else {
        assessment.areas_to_improve.join(", ")
    };

    format!(
        r#"请为以下孩子生成一个{duration}的幼小衔接计划：

孩子信息：
- 年龄：{age}岁
- 语言能力：倾听{}/5，表达{}/5，阅读{}/5，书写兴趣{}/5
- 数学能力：计数{}/5，运算{}/5，图形{}/5，空间{}/5
- 社交能力：{}/5
- 自理能力：{}/5
- 运动能力：{}/5
- 兴趣爱好：{}
- 家长担忧：{}

评估结果：
- 整体水平：{}
- 优势：{strengths}
- 需加强：{areas}

请生成：
1. 每周重点目标（4周）
2. 每日推荐活动
3. 推荐资源
4. 家长注意事项

请严格只返回JSON，不要包含解释、markdown或代码块。JSON结构示例：
{{
  "duration": "{duration}",
  "weekly_goals": ["..."],
  "daily_activities": [{{"time": "...", "activity": "...", "goal": "..."}}],
  "resources": ["..."],
  "parent_tips": ["..."],
  "evaluation_criteria": ["..."]
}}
"#,
        lang.listening,
        lang.expression,
        lang.reading,
        lang.writing_interest,
        math.counting,
        math.operation,
        math.shapes,
        math.space,
        profile.social,
        profile.self_care,
        profile.motor,
        profile.interests.join(", "),
        profile.concerns.join(", "),
        assessment.overall_level,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assessment::calculate_assessment;
    use crate::model::{Dimension, Score};

    const PLAN_JSON: &str = r#"{
  "duration": "3个月",
  "weekly_goals": ["建立作息", "练习表达"],
  "daily_activities": [{"time": "早晨", "activity": "亲子阅读", "goal": "语言"}],
  "resources": ["《我上小学了》"],
  "parent_tips": ["多鼓励"],
  "evaluation_criteria": ["能独立整理书包"]
}"#;

    #[test]
    fn parses_bare_json() {
        match parse_plan_response(PLAN_JSON) {
            PlanOutcome::Structured(plan) => {
                assert_eq!(plan.duration, "3个月");
                assert_eq!(plan.weekly_goals.len(), 2);
                assert_eq!(plan.daily_activities[0].activity, "亲子阅读");
            }
            other => panic!("expected structured plan, got {other:?}"),
        }
    }

    #[test]
    fn parses_json_inside_prose_and_fences() {
        let reply = format!("好的，这是计划：\n```json\n{PLAN_JSON}\n```\n祝顺利！");
        assert!(matches!(
            parse_plan_response(&reply),
            PlanOutcome::Structured(_)
        ));
    }

    #[test]
    fn missing_fields_default() {
        match parse_plan_response(r#"{"weekly_goals": ["只有目标"]}"#) {
            PlanOutcome::Structured(plan) => {
                assert!(plan.duration.is_empty());
                assert_eq!(plan.weekly_goals, vec!["只有目标"]);
                assert!(plan.daily_activities.is_empty());
            }
            other => panic!("expected structured plan, got {other:?}"),
        }
    }

    #[test]
    fn non_json_is_raw() {
        let reply = "第一周：多读绘本。第二周：练习数数。";
        assert_eq!(parse_plan_response(reply), PlanOutcome::Raw(reply.into()));
    }

    #[test]
    fn json_array_is_raw() {
        let reply = r#"["读绘本", "数数"]"#;
        assert_eq!(parse_plan_response(reply), PlanOutcome::Raw(reply.into()));
    }

    #[test]
    fn wrongly_shaped_object_is_raw() {
        let reply = r#"{"weekly_goals": "每天阅读"}"#;
        assert!(matches!(parse_plan_response(reply), PlanOutcome::Raw(_)));
    }

    #[test]
    fn markdown_has_all_sections() {
        let PlanOutcome::Structured(plan) = parse_plan_response(PLAN_JSON) else {
            panic!("expected structured plan");
        };
        let md = plan.to_markdown();
        assert!(md.contains("**周期：** 3个月"));
        assert!(md.contains("### 每周重点目标"));
        assert!(md.contains("| 早晨 | 亲子阅读 | 语言 |"));
        assert!(md.contains("### 推荐资源"));
        assert!(md.contains("### 家长注意事项"));
        assert!(md.contains("### 评估标准"));
    }

    #[test]
    fn sample_plan_skips_empty_sections() {
        let md = TransitionPlan::sample().to_markdown();
        assert!(md.contains("第一周：习惯养成"));
        assert!(md.contains("| 睡前 | 整理书包 | 自理能力 |"));
        assert!(!md.contains("推荐资源"));
    }

    #[test]
    fn prompt_includes_scores_and_assessment() {
        let mut profile = AbilityProfile::uniform(Score::clamped(3))
            .with(Dimension::Listening, Score::clamped(5))
            .with(Dimension::SelfCare, Score::clamped(1));
        profile.age = Some(5.5);
        profile.interests = vec!["画画".into(), "拼图".into()];
        let assessment = calculate_assessment(&profile);

        let prompt = build_plan_prompt(&profile, &assessment, DEFAULT_DURATION);
        assert!(prompt.contains("生成一个3个月的幼小衔接计划"));
        assert!(prompt.contains("年龄：5.5岁"));
        assert!(prompt.contains("倾听5/5"));
        assert!(prompt.contains("自理能力：1/5"));
        assert!(prompt.contains("兴趣爱好：画画, 拼图"));
        assert!(prompt.contains("整体水平：良好"));
        assert!(prompt.contains("需加强：自理能力"));
        assert!(prompt.contains(r#""duration": "3个月""#));
    }

    #[test]
    fn prompt_placeholders_when_no_feedback() {
        let profile = AbilityProfile::default();
        let assessment = calculate_assessment(&profile);
        let prompt = build_plan_prompt(&profile, &assessment, "6周");
        assert!(prompt.contains("优势：暂无明显优势"));
        assert!(prompt.contains("需加强：暂无明显不足"));
        assert!(prompt.contains("年龄：未知岁"));
    }
}
