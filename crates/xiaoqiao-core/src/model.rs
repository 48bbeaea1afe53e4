//! Core data model types for xiaoqiao.
//!
//! An [`AbilityProfile`] is built from an arbitrary JSON/TOML document and is
//! always well-formed: every rating is normalized into a [`Score`] before the
//! assessment engine ever sees it.

use std::fmt;
use std::num::IntErrorKind;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single 1–5 rating.
///
/// Construction goes through [`Score::clamped`] or [`Score::from_value`], so a
/// `Score` outside 1..=5 cannot exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "Value", into = "u8")]
pub struct Score(u8);

/// How a raw value was turned into a [`Score`].
#[derive(Debug, Clone, PartialEq)]
pub enum Coercion {
    /// The value was an in-range integer.
    Exact,
    /// The field was absent or null; the neutral default was used.
    Missing,
    /// The value could not be read as an integer; the neutral default was used.
    Unparseable,
    /// A fractional number was truncated toward zero.
    Truncated { from: f64 },
    /// An out-of-range integer was clamped to the nearest bound.
    Clamped { from: i64 },
}

impl Score {
    pub const MIN: Score = Score(1);
    pub const MAX: Score = Score(5);
    /// Substituted for anything that is missing or not an integer.
    pub const NEUTRAL: Score = Score(3);

    /// Clamp any integer into 1..=5.
    pub fn clamped(value: i64) -> Self {
        Score(value.clamp(1, 5) as u8)
    }

    /// Normalize a raw document value. Never fails.
    pub fn from_value(value: Option<&Value>) -> Self {
        Self::normalize(value).0
    }

    /// Normalize a raw document value and report the coercion applied.
    pub fn normalize(value: Option<&Value>) -> (Self, Coercion) {
        let raw = match value {
            None | Some(Value::Null) => return (Self::NEUTRAL, Coercion::Missing),
            Some(v) => v,
        };

        let (int, truncated_from) = match to_int(raw) {
            Some(pair) => pair,
            None => return (Self::NEUTRAL, Coercion::Unparseable),
        };

        let score = Self::clamped(int);
        let coercion = if i64::from(score.0) != int {
            Coercion::Clamped { from: int }
        } else if let Some(from) = truncated_from {
            Coercion::Truncated { from }
        } else {
            Coercion::Exact
        };
        (score, coercion)
    }

    /// The rating as a plain integer.
    pub fn get(self) -> u8 {
        self.0
    }

    /// Whether this rating counts as a strength (4 or 5).
    pub fn is_strength(self) -> bool {
        self.0 >= 4
    }

    /// Whether this rating counts as an area to improve (1 or 2).
    pub fn needs_improvement(self) -> bool {
        self.0 <= 2
    }
}

/// Integer conversion with `int()` semantics. Returns the integer and, for
/// fractional floats, the original value.
fn to_int(value: &Value) -> Option<(i64, Option<f64>)> {
    match value {
        Value::Bool(b) => Some((i64::from(*b), None)),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Some((i, None))
            } else if n.as_u64().is_some() {
                Some((i64::MAX, None))
            } else {
                let f = n.as_f64().filter(|f| f.is_finite())?;
                let truncated = f.trunc();
                let from = (truncated != f).then_some(f);
                // `as` saturates for out-of-range floats
                Some((truncated as i64, from))
            }
        }
        Value::String(s) => parse_int_str(s).map(|i| (i, None)),
        _ => None,
    }
}

fn parse_int_str(s: &str) -> Option<i64> {
    let trimmed = s.trim();
    match trimmed.parse::<i64>() {
        Ok(i) => Some(i),
        Err(e) => match e.kind() {
            IntErrorKind::PosOverflow => Some(i64::MAX),
            IntErrorKind::NegOverflow => Some(i64::MIN),
            _ => None,
        },
    }
}

impl Default for Score {
    fn default() -> Self {
        Self::NEUTRAL
    }
}

impl From<Value> for Score {
    fn from(value: Value) -> Self {
        Score::from_value(Some(&value))
    }
}

impl From<Score> for u8 {
    fn from(score: Score) -> Self {
        score.0
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Which block of the questionnaire a dimension belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Language,
    Math,
    Social,
    SelfCare,
    Motor,
}

/// One of the eleven individually rated sub-skills.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Listening,
    Expression,
    Reading,
    WritingInterest,
    Counting,
    Operation,
    Shapes,
    Space,
    Social,
    SelfCare,
    Motor,
}

impl Dimension {
    /// All dimensions in evaluation order.
    pub const ALL: [Dimension; 11] = [
        Dimension::Listening,
        Dimension::Expression,
        Dimension::Reading,
        Dimension::WritingInterest,
        Dimension::Counting,
        Dimension::Operation,
        Dimension::Shapes,
        Dimension::Space,
        Dimension::Social,
        Dimension::SelfCare,
        Dimension::Motor,
    ];

    /// Field name in profile documents.
    pub fn key(self) -> &'static str {
        match self {
            Dimension::Listening => "listening",
            Dimension::Expression => "expression",
            Dimension::Reading => "reading",
            Dimension::WritingInterest => "writing_interest",
            Dimension::Counting => "counting",
            Dimension::Operation => "operation",
            Dimension::Shapes => "shapes",
            Dimension::Space => "space",
            Dimension::Social => "social",
            Dimension::SelfCare => "self_care",
            Dimension::Motor => "motor",
        }
    }

    pub fn category(self) -> Category {
        match self {
            Dimension::Listening
            | Dimension::Expression
            | Dimension::Reading
            | Dimension::WritingInterest => Category::Language,
            Dimension::Counting | Dimension::Operation | Dimension::Shapes | Dimension::Space => {
                Category::Math
            }
            Dimension::Social => Category::Social,
            Dimension::SelfCare => Category::SelfCare,
            Dimension::Motor => Category::Motor,
        }
    }

    /// Questionnaire heading for this dimension.
    pub fn title(self) -> &'static str {
        match self {
            Dimension::Listening => "倾听理解",
            Dimension::Expression => "表达交流",
            Dimension::Reading => "阅读习惯",
            Dimension::WritingInterest => "书写兴趣",
            Dimension::Counting => "数数能力",
            Dimension::Operation => "计算能力",
            Dimension::Shapes => "图形认知",
            Dimension::Space => "空间方位",
            Dimension::Social => "社交能力",
            Dimension::SelfCare => "自理能力",
            Dimension::Motor => "运动能力",
        }
    }

    /// Dotted path of this field inside a profile document.
    pub fn path(self) -> String {
        match self.category() {
            Category::Language => format!("language.{}", self.key()),
            Category::Math => format!("math.{}", self.key()),
            _ => self.key().to_string(),
        }
    }

    /// Look up this dimension's raw value in a profile document.
    pub fn raw_value(self, document: &Value) -> Option<&Value> {
        match self.category() {
            Category::Language => document.get("language")?.get(self.key()),
            Category::Math => document.get("math")?.get(self.key()),
            _ => document.get(self.key()),
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Dimension {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_lowercase().replace('-', "_");
        Dimension::ALL
            .into_iter()
            .find(|d| d.key() == key || d.path() == key)
            .ok_or_else(|| format!("unknown dimension: {s}"))
    }
}

/// Language sub-skills.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LanguageAbility {
    pub listening: Score,
    pub expression: Score,
    pub reading: Score,
    pub writing_interest: Score,
}

impl LanguageAbility {
    /// Arithmetic mean of the four sub-scores.
    pub fn average(&self) -> f64 {
        mean(&[
            self.listening,
            self.expression,
            self.reading,
            self.writing_interest,
        ])
    }
}

/// Math sub-skills.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MathAbility {
    pub counting: Score,
    pub operation: Score,
    pub shapes: Score,
    pub space: Score,
}

impl MathAbility {
    /// Arithmetic mean of the four sub-scores.
    pub fn average(&self) -> f64 {
        mean(&[self.counting, self.operation, self.shapes, self.space])
    }
}

fn mean(scores: &[Score]) -> f64 {
    let sum: u32 = scores.iter().map(|s| u32::from(s.get())).sum();
    f64::from(sum) / scores.len() as f64
}

/// A child's questionnaire answers, normalized.
///
/// Deserializes from any document shape; see [`AbilityProfile::from_value`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Value")]
pub struct AbilityProfile {
    /// Child's name. Not used by the engine.
    pub name: String,
    /// Age in years. Not used by the engine.
    pub age: Option<f64>,
    pub language: LanguageAbility,
    pub math: MathAbility,
    pub social: Score,
    pub self_care: Score,
    pub motor: Score,
    /// Free-text interest tags.
    pub interests: Vec<String>,
    /// Free-text parent concern tags.
    pub concerns: Vec<String>,
}

impl AbilityProfile {
    /// Build a profile from a raw document. Total over all inputs: missing or
    /// malformed ratings become the neutral score.
    pub fn from_value(document: &Value) -> Self {
        let score = |d: Dimension| Score::from_value(d.raw_value(document));

        Self {
            name: document
                .get("name")
                .and_then(Value::as_str)
                .map(|s| s.trim().to_string())
                .unwrap_or_default(),
            age: document.get("age").and_then(|v| match v {
                Value::Number(n) => n.as_f64(),
                Value::String(s) => s.trim().parse().ok(),
                _ => None,
            }),
            language: LanguageAbility {
                listening: score(Dimension::Listening),
                expression: score(Dimension::Expression),
                reading: score(Dimension::Reading),
                writing_interest: score(Dimension::WritingInterest),
            },
            math: MathAbility {
                counting: score(Dimension::Counting),
                operation: score(Dimension::Operation),
                shapes: score(Dimension::Shapes),
                space: score(Dimension::Space),
            },
            social: score(Dimension::Social),
            self_care: score(Dimension::SelfCare),
            motor: score(Dimension::Motor),
            interests: tag_list(document.get("interests")),
            concerns: tag_list(document.get("concerns")),
        }
    }

    /// A profile with every dimension set to the same rating.
    pub fn uniform(score: Score) -> Self {
        let mut profile = Self::default();
        for dimension in Dimension::ALL {
            profile.set(dimension, score);
        }
        profile
    }

    /// The normalized rating for one dimension.
    pub fn score(&self, dimension: Dimension) -> Score {
        match dimension {
            Dimension::Listening => self.language.listening,
            Dimension::Expression => self.language.expression,
            Dimension::Reading => self.language.reading,
            Dimension::WritingInterest => self.language.writing_interest,
            Dimension::Counting => self.math.counting,
            Dimension::Operation => self.math.operation,
            Dimension::Shapes => self.math.shapes,
            Dimension::Space => self.math.space,
            Dimension::Social => self.social,
            Dimension::SelfCare => self.self_care,
            Dimension::Motor => self.motor,
        }
    }

    /// Replace the rating for one dimension.
    pub fn set(&mut self, dimension: Dimension, score: Score) {
        let slot = match dimension {
            Dimension::Listening => &mut self.language.listening,
            Dimension::Expression => &mut self.language.expression,
            Dimension::Reading => &mut self.language.reading,
            Dimension::WritingInterest => &mut self.language.writing_interest,
            Dimension::Counting => &mut self.math.counting,
            Dimension::Operation => &mut self.math.operation,
            Dimension::Shapes => &mut self.math.shapes,
            Dimension::Space => &mut self.math.space,
            Dimension::Social => &mut self.social,
            Dimension::SelfCare => &mut self.self_care,
            Dimension::Motor => &mut self.motor,
        };
        *slot = score;
    }

    /// Builder-style variant of [`AbilityProfile::set`].
    pub fn with(mut self, dimension: Dimension, score: Score) -> Self {
        self.set(dimension, score);
        self
    }

    /// Display name, falling back to a generic label.
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            "孩子"
        } else {
            &self.name
        }
    }
}

impl From<Value> for AbilityProfile {
    fn from(document: Value) -> Self {
        Self::from_value(&document)
    }
}

fn tag_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s.trim().to_string()),
                Value::Null => None,
                other => Some(other.to_string()),
            })
            .filter(|s| !s.is_empty())
            .collect(),
        Some(Value::String(s)) if !s.trim().is_empty() => vec![s.trim().to_string()],
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn normalize_handles_every_input_shape() {
        let cases = [
            (json!(-5), 1),
            (json!(0), 1),
            (json!(1), 1),
            (json!(3), 3),
            (json!(5), 5),
            (json!(6), 5),
            (json!(100), 5),
            (json!("x"), 3),
            (json!(null), 3),
            (json!("4"), 4),
            (json!(" 2 "), 2),
            (json!("4.5"), 3),
            (json!(4.9), 4),
            (json!(-0.5), 1),
            (json!(true), 1),
            (json!(false), 1),
            (json!([4]), 3),
            (json!({"v": 4}), 3),
            (json!(u64::MAX), 5),
            (json!("99999999999999999999999"), 5),
            (json!("-99999999999999999999999"), 1),
            (json!(1e300), 5),
        ];
        for (raw, expected) in cases {
            let score = Score::from_value(Some(&raw));
            assert_eq!(score.get(), expected, "input {raw}");
        }
        assert_eq!(Score::from_value(None), Score::NEUTRAL);
    }

    #[test]
    fn normalize_reports_coercion() {
        assert_eq!(Score::normalize(Some(&json!(4))).1, Coercion::Exact);
        assert_eq!(Score::normalize(None).1, Coercion::Missing);
        assert_eq!(Score::normalize(Some(&json!(null))).1, Coercion::Missing);
        assert_eq!(Score::normalize(Some(&json!("x"))).1, Coercion::Unparseable);
        assert_eq!(
            Score::normalize(Some(&json!(7))).1,
            Coercion::Clamped { from: 7 }
        );
        assert_eq!(
            Score::normalize(Some(&json!(2.5))).1,
            Coercion::Truncated { from: 2.5 }
        );
    }

    #[test]
    fn profile_from_malformed_document_is_neutral() {
        for doc in [json!(null), json!([1, 2]), json!("profile"), json!({"language": "good"})] {
            let profile = AbilityProfile::from_value(&doc);
            for d in Dimension::ALL {
                assert_eq!(profile.score(d), Score::NEUTRAL, "{d} for {doc}");
            }
        }
    }

    #[test]
    fn profile_reads_nested_fields_and_metadata() {
        let doc = json!({
            "name": " 小明 ",
            "age": 5.5,
            "language": {"listening": 4, "expression": "5", "reading": 0},
            "math": {"counting": 9, "space": 2},
            "social": 1,
            "self_care": 2.7,
            "interests": ["画画", "拼图", ""],
            "concerns": "专注力"
        });
        let profile = AbilityProfile::from_value(&doc);
        assert_eq!(profile.name, "小明");
        assert_eq!(profile.age, Some(5.5));
        assert_eq!(profile.language.listening.get(), 4);
        assert_eq!(profile.language.expression.get(), 5);
        assert_eq!(profile.language.reading.get(), 1);
        assert_eq!(profile.language.writing_interest.get(), 3);
        assert_eq!(profile.math.counting.get(), 5);
        assert_eq!(profile.math.operation.get(), 3);
        assert_eq!(profile.math.space.get(), 2);
        assert_eq!(profile.social.get(), 1);
        assert_eq!(profile.self_care.get(), 2);
        assert_eq!(profile.motor.get(), 3);
        assert_eq!(profile.interests, vec!["画画", "拼图"]);
        assert_eq!(profile.concerns, vec!["专注力"]);
    }

    #[test]
    fn profile_serde_roundtrip_keeps_scores() {
        let profile = AbilityProfile::uniform(Score::clamped(4)).with(Dimension::Motor, Score::MIN);
        let json = serde_json::to_string(&profile).unwrap();
        let back: AbilityProfile = serde_json::from_str(&json).unwrap();
        assert_eq!(back, profile);
    }

    #[test]
    fn profile_deserializes_from_toml() {
        let toml_str = r#"
name = "小红"
social = 5

[language]
listening = 2
"#;
        let profile: AbilityProfile = toml::from_str(toml_str).unwrap();
        assert_eq!(profile.name, "小红");
        assert_eq!(profile.social.get(), 5);
        assert_eq!(profile.language.listening.get(), 2);
    }

    #[test]
    fn dimension_parse_and_paths() {
        assert_eq!("self_care".parse::<Dimension>().unwrap(), Dimension::SelfCare);
        assert_eq!("writing-interest".parse::<Dimension>().unwrap(), Dimension::WritingInterest);
        assert_eq!("math.space".parse::<Dimension>().unwrap(), Dimension::Space);
        assert!("singing".parse::<Dimension>().is_err());
        assert_eq!(Dimension::Reading.path(), "language.reading");
        assert_eq!(Dimension::Motor.path(), "motor");
    }

    #[test]
    fn averages_are_unrounded() {
        let profile = AbilityProfile::default()
            .with(Dimension::Listening, Score::clamped(5))
            .with(Dimension::Expression, Score::clamped(2))
            .with(Dimension::Reading, Score::clamped(4));
        assert!((profile.language.average() - 3.5).abs() < f64::EPSILON);
        assert!((profile.math.average() - 3.0).abs() < f64::EPSILON);
    }
}
