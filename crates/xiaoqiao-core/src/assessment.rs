//! Deterministic assessment engine.
//!
//! Maps a normalized [`AbilityProfile`] to an [`AssessmentResult`]: per-item
//! feedback from a fixed table, plus an overall level from the additive total
//! of the two category averages and the three single-item dimensions.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::model::{AbilityProfile, Dimension};

/// Totals at or above this are [`OverallLevel::Excellent`].
pub const EXCELLENT_THRESHOLD: f64 = 18.0;
/// Totals at or above this (and below [`EXCELLENT_THRESHOLD`]) are [`OverallLevel::Good`].
pub const GOOD_THRESHOLD: f64 = 12.0;

/// Headline verdict. Ordered worst to best.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum OverallLevel {
    #[serde(rename = "需加强关注")]
    NeedsAttention,
    #[serde(rename = "良好")]
    Good,
    #[serde(rename = "优秀")]
    Excellent,
}

impl OverallLevel {
    /// The label shown to parents.
    pub fn label(self) -> &'static str {
        match self {
            OverallLevel::NeedsAttention => "需加强关注",
            OverallLevel::Good => "良好",
            OverallLevel::Excellent => "优秀",
        }
    }

    /// Summary recommendation appended after the per-item tips, if any.
    pub fn summary_recommendation(self) -> Option<&'static str> {
        match self {
            OverallLevel::Excellent => Some("孩子发展良好，可以顺利过渡到小学"),
            OverallLevel::Good => None,
            OverallLevel::NeedsAttention => Some("建议增加幼小衔接训练的投入"),
        }
    }

    /// Banner colour used by renderers.
    pub fn color(self) -> &'static str {
        match self {
            OverallLevel::Excellent => "green",
            OverallLevel::Good => "yellow",
            OverallLevel::NeedsAttention => "red",
        }
    }
}

impl fmt::Display for OverallLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for OverallLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "优秀" => Ok(OverallLevel::Excellent),
            "良好" => Ok(OverallLevel::Good),
            "需加强关注" => Ok(OverallLevel::NeedsAttention),
            other => match other.to_lowercase().replace(['-', ' '], "_").as_str() {
                "excellent" => Ok(OverallLevel::Excellent),
                "good" => Ok(OverallLevel::Good),
                "needs_attention" | "attention" => Ok(OverallLevel::NeedsAttention),
                _ => Err(format!("unknown overall level: {other}")),
            },
        }
    }
}

/// Fixed feedback attached to one dimension.
#[derive(Debug, Clone, Copy)]
pub struct Feedback {
    pub dimension: Dimension,
    /// Appended to `strengths` when the score is 4 or 5.
    pub strength: &'static str,
    /// Appended to `areas_to_improve` when the score is 1 or 2.
    pub area: &'static str,
    /// Appended to `recommendations` alongside `area`.
    pub tip: &'static str,
}

/// Feedback table in evaluation order. Output lists follow this order.
pub const FEEDBACK: [Feedback; 11] = [
    Feedback {
        dimension: Dimension::Listening,
        strength: "倾听能力较好，能听懂指令",
        area: "倾听理解能力",
        tip: "多与孩子交流复杂指令，锻炼理解能力",
    },
    Feedback {
        dimension: Dimension::Expression,
        strength: "语言表达清晰流畅",
        area: "语言表达能力",
        tip: "每天15分钟亲子对话，鼓励孩子复述故事",
    },
    Feedback {
        dimension: Dimension::Reading,
        strength: "阅读兴趣浓厚",
        area: "阅读习惯",
        tip: "建立固定阅读时间，选择孩子感兴趣的绘本",
    },
    Feedback {
        dimension: Dimension::WritingInterest,
        strength: "对书写有兴趣，能进行简单书写",
        area: "书写兴趣与握笔习惯",
        tip: "用描红、描写名字等方式增强书写兴趣",
    },
    Feedback {
        dimension: Dimension::Counting,
        strength: "计数能力较强",
        area: "计数能力",
        tip: "通过实物点数练习，20以内手口一致点数",
    },
    Feedback {
        dimension: Dimension::Operation,
        strength: "运算能力发展良好",
        area: "简单运算",
        tip: "用实物游戏理解加减法含义",
    },
    Feedback {
        dimension: Dimension::Shapes,
        strength: "图形认知能力好",
        area: "图形认知",
        tip: "通过积木、拼图认识基本几何图形",
    },
    Feedback {
        dimension: Dimension::Space,
        strength: "空间方位感较强",
        area: "空间感知",
        tip: "多进行上下前后左右的方位游戏",
    },
    Feedback {
        dimension: Dimension::Social,
        strength: "社交能力强，愿意与同伴合作",
        area: "社交能力",
        tip: "创造合作游戏机会，鼓励轮流与分享",
    },
    Feedback {
        dimension: Dimension::SelfCare,
        strength: "自理能力强",
        area: "自理能力",
        tip: "开始训练独立整理书包、穿脱衣物",
    },
    Feedback {
        dimension: Dimension::Motor,
        strength: "运动和动手能力好",
        area: "运动能力",
        tip: "增加户外运动和精细动作练习",
    },
];

/// Look up the feedback entry for a dimension.
pub fn feedback_for(dimension: Dimension) -> &'static Feedback {
    // FEEDBACK is indexed in Dimension::ALL order
    &FEEDBACK[dimension as usize]
}

/// The five additive terms of the total score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CategoryScores {
    pub language_average: f64,
    pub math_average: f64,
    pub social: u8,
    pub self_care: u8,
    pub motor: u8,
}

impl CategoryScores {
    pub fn from_profile(profile: &AbilityProfile) -> Self {
        Self {
            language_average: profile.language.average(),
            math_average: profile.math.average(),
            social: profile.social.get(),
            self_care: profile.self_care.get(),
            motor: profile.motor.get(),
        }
    }

    /// `language_average + math_average + social + self_care + motor`, in that order.
    pub fn total(&self) -> f64 {
        self.language_average
            + self.math_average
            + f64::from(self.social)
            + f64::from(self.self_care)
            + f64::from(self.motor)
    }
}

/// Outcome of an assessment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessmentResult {
    pub overall_level: OverallLevel,
    /// One label per dimension scoring 4 or 5.
    pub strengths: Vec<String>,
    /// One label per dimension scoring 1 or 2.
    pub areas_to_improve: Vec<String>,
    /// One tip per weak dimension, then the level summary if there is one.
    pub recommendations: Vec<String>,
    /// The terms the overall level was computed from.
    pub scores: CategoryScores,
}

impl AssessmentResult {
    pub fn total_score(&self) -> f64 {
        self.scores.total()
    }
}

/// Classify an additive total. Lower bounds are inclusive.
pub fn classify_total(total: f64) -> OverallLevel {
    if total >= EXCELLENT_THRESHOLD {
        OverallLevel::Excellent
    } else if total >= GOOD_THRESHOLD {
        OverallLevel::Good
    } else {
        OverallLevel::NeedsAttention
    }
}

/// Assess a normalized profile.
pub fn calculate_assessment(profile: &AbilityProfile) -> AssessmentResult {
    let scores = CategoryScores::from_profile(profile);

    let mut strengths = Vec::new();
    let mut areas_to_improve = Vec::new();
    let mut recommendations = Vec::new();

    for entry in &FEEDBACK {
        let score = profile.score(entry.dimension);
        if score.is_strength() {
            strengths.push(entry.strength.to_string());
        } else if score.needs_improvement() {
            areas_to_improve.push(entry.area.to_string());
            recommendations.push(entry.tip.to_string());
        }
    }

    let overall_level = classify_total(scores.total());
    if let Some(summary) = overall_level.summary_recommendation() {
        recommendations.push(summary.to_string());
    }

    tracing::debug!(
        level = %overall_level,
        total = scores.total(),
        strengths = strengths.len(),
        areas = areas_to_improve.len(),
        "assessment computed"
    );

    AssessmentResult {
        overall_level,
        strengths,
        areas_to_improve,
        recommendations,
        scores,
    }
}

/// Assess a raw profile document of any shape.
pub fn assess_value(document: &Value) -> AssessmentResult {
    calculate_assessment(&AbilityProfile::from_value(document))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Score;
    use serde_json::json;

    fn all(score: i64) -> AbilityProfile {
        AbilityProfile::uniform(Score::clamped(score))
    }

    #[test]
    fn feedback_table_matches_dimension_order() {
        for (entry, dimension) in FEEDBACK.iter().zip(Dimension::ALL) {
            assert_eq!(entry.dimension, dimension);
            assert_eq!(feedback_for(dimension).dimension, dimension);
        }
    }

    #[test]
    fn all_threes_is_good_with_no_feedback() {
        let result = calculate_assessment(&all(3));
        assert!((result.total_score() - 15.0).abs() < f64::EPSILON);
        assert_eq!(result.overall_level, OverallLevel::Good);
        assert!(result.strengths.is_empty());
        assert!(result.areas_to_improve.is_empty());
        assert!(result.recommendations.is_empty());
    }

    #[test]
    fn all_fives_is_excellent() {
        let result = calculate_assessment(&all(5));
        assert!((result.total_score() - 25.0).abs() < f64::EPSILON);
        assert_eq!(result.overall_level, OverallLevel::Excellent);
        assert_eq!(result.strengths.len(), 11);
        assert_eq!(result.strengths[0], "倾听能力较好，能听懂指令");
        assert_eq!(result.strengths[10], "运动和动手能力好");
        assert!(result.areas_to_improve.is_empty());
        assert_eq!(result.recommendations, vec!["孩子发展良好，可以顺利过渡到小学"]);
    }

    #[test]
    fn all_ones_needs_attention() {
        let result = calculate_assessment(&all(1));
        assert!((result.total_score() - 5.0).abs() < f64::EPSILON);
        assert_eq!(result.overall_level, OverallLevel::NeedsAttention);
        assert!(result.strengths.is_empty());
        assert_eq!(result.areas_to_improve.len(), 11);
        assert_eq!(result.recommendations.len(), 12);
        let expected_areas: Vec<&str> = FEEDBACK.iter().map(|f| f.area).collect();
        assert_eq!(result.areas_to_improve, expected_areas);
        assert_eq!(result.recommendations[0], "多与孩子交流复杂指令，锻炼理解能力");
        assert_eq!(result.recommendations[11], "建议增加幼小衔接训练的投入");
    }

    #[test]
    fn all_fours_is_excellent_at_twenty() {
        let result = calculate_assessment(&all(4));
        assert!((result.total_score() - 20.0).abs() < f64::EPSILON);
        assert_eq!(result.overall_level, OverallLevel::Excellent);
    }

    #[test]
    fn threshold_boundaries_are_inclusive() {
        assert_eq!(classify_total(18.0), OverallLevel::Excellent);
        assert_eq!(classify_total(17.999), OverallLevel::Good);
        assert_eq!(classify_total(12.0), OverallLevel::Good);
        assert_eq!(classify_total(11.999), OverallLevel::NeedsAttention);
        assert_eq!(classify_total(5.0), OverallLevel::NeedsAttention);
        assert_eq!(classify_total(25.0), OverallLevel::Excellent);
    }

    #[test]
    fn profile_totalling_exactly_eighteen_is_excellent() {
        // language 3.0 + math 3.0 + 4 + 4 + 4
        let profile = all(3)
            .with(Dimension::Social, Score::clamped(4))
            .with(Dimension::SelfCare, Score::clamped(4))
            .with(Dimension::Motor, Score::clamped(4));
        let result = calculate_assessment(&profile);
        assert!((result.total_score() - 18.0).abs() < f64::EPSILON);
        assert_eq!(result.overall_level, OverallLevel::Excellent);
    }

    #[test]
    fn profile_totalling_exactly_twelve_is_good() {
        // language 2.0 + math 2.0 + 3 + 3 + 2
        let mut profile = all(2);
        profile.social = Score::clamped(3);
        profile.self_care = Score::clamped(3);
        let result = calculate_assessment(&profile);
        assert!((result.total_score() - 12.0).abs() < f64::EPSILON);
        assert_eq!(result.overall_level, OverallLevel::Good);

        let lower = calculate_assessment(&profile.with(Dimension::Space, Score::MIN));
        assert!((lower.total_score() - 11.75).abs() < f64::EPSILON);
        assert_eq!(lower.overall_level, OverallLevel::NeedsAttention);
    }

    #[test]
    fn mixed_items_in_one_category_fire_independently() {
        let profile = all(3)
            .with(Dimension::Listening, Score::clamped(5))
            .with(Dimension::Expression, Score::clamped(2))
            .with(Dimension::Reading, Score::clamped(4));
        let result = calculate_assessment(&profile);
        assert!((result.scores.language_average - 3.5).abs() < f64::EPSILON);
        assert_eq!(
            result.strengths,
            vec!["倾听能力较好，能听懂指令", "阅读兴趣浓厚"]
        );
        assert_eq!(result.areas_to_improve, vec!["语言表达能力"]);
        assert_eq!(
            result.recommendations,
            vec!["每天15分钟亲子对话，鼓励孩子复述故事"]
        );
    }

    #[test]
    fn raising_one_dimension_never_lowers_the_verdict() {
        for dimension in Dimension::ALL {
            let mut previous_total = f64::MIN;
            let mut previous_level = OverallLevel::NeedsAttention;
            for value in 1..=5 {
                let profile = all(3).with(dimension, Score::clamped(value));
                let result = calculate_assessment(&profile);
                assert!(result.total_score() >= previous_total, "{dimension} at {value}");
                assert!(result.overall_level >= previous_level, "{dimension} at {value}");
                previous_total = result.total_score();
                previous_level = result.overall_level;
            }
        }
    }

    #[test]
    fn malformed_documents_never_panic() {
        let documents = [
            json!(null),
            json!({}),
            json!({"language": null, "math": []}),
            json!({"language": {"listening": "x", "expression": -5}, "social": 100}),
            json!({"math": {"counting": 2.5, "operation": [1]}, "motor": {"a": 1}}),
            json!({"self_care": "NaN", "social": false}),
        ];
        for doc in documents {
            let result = assess_value(&doc);
            let total = result.total_score();
            assert!((5.0..=25.0).contains(&total), "{doc} -> {total}");
        }
    }

    #[test]
    fn reference_profile_matches_expected_verdict() {
        let doc = json!({
            "name": "小明",
            "age": 5.5,
            "language": {"listening": 4, "expression": 4, "reading": 3, "writing_interest": 3},
            "math": {"counting": 4, "operation": 3, "shapes": 3, "space": 3},
            "social": 3,
            "self_care": 2,
            "motor": 4,
            "interests": ["画画", "拼图"],
            "concerns": ["自理能力", "专注力"]
        });
        let result = assess_value(&doc);
        // 3.5 + 3.25 + 3 + 2 + 4
        assert!((result.total_score() - 15.75).abs() < f64::EPSILON);
        assert_eq!(result.overall_level, OverallLevel::Good);
        assert_eq!(
            result.strengths,
            vec![
                "倾听能力较好，能听懂指令",
                "语言表达清晰流畅",
                "计数能力较强",
                "运动和动手能力好"
            ]
        );
        assert_eq!(result.areas_to_improve, vec!["自理能力"]);
        assert_eq!(result.recommendations, vec!["开始训练独立整理书包、穿脱衣物"]);
    }

    #[test]
    fn level_labels_parse_and_serialize() {
        assert_eq!("优秀".parse::<OverallLevel>().unwrap(), OverallLevel::Excellent);
        assert_eq!("needs-attention".parse::<OverallLevel>().unwrap(), OverallLevel::NeedsAttention);
        assert!("average".parse::<OverallLevel>().is_err());
        assert_eq!(
            serde_json::to_string(&OverallLevel::Good).unwrap(),
            "\"良好\""
        );
        assert!(OverallLevel::NeedsAttention < OverallLevel::Good);
        assert!(OverallLevel::Good < OverallLevel::Excellent);
    }
}
