//! Assessment reports with JSON persistence and progress tracking.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::assessment::{calculate_assessment, AssessmentResult, OverallLevel};
use crate::model::{AbilityProfile, Dimension};

/// A saved assessment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssessmentReport {
    /// Unique report identifier.
    pub id: Uuid,
    /// When the assessment was taken.
    pub created_at: DateTime<Utc>,
    pub profile: AbilityProfile,
    pub result: AssessmentResult,
}

impl AssessmentReport {
    /// Assess `profile` and stamp the result.
    pub fn new(profile: AbilityProfile) -> Self {
        let result = calculate_assessment(&profile);
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            profile,
            result,
        }
    }

    /// Save the report as JSON to a file.
    pub fn save_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("failed to serialize report")?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)
            .with_context(|| format!("failed to write report to {}", path.display()))?;
        Ok(())
    }

    /// Load a report from a JSON file.
    pub fn load_json(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read report from {}", path.display()))?;
        let report: AssessmentReport =
            serde_json::from_str(&content).context("failed to parse report JSON")?;
        Ok(report)
    }

    /// Format the assessment as markdown.
    pub fn to_markdown(&self) -> String {
        let result = &self.result;
        let scores = &result.scores;
        let mut md = String::new();

        md.push_str(&format!("## {} 的幼小衔接评估\n\n", self.profile.display_name()));
        md.push_str(&format!(
            "**整体水平：** {}（总分 {:.2}）\n\n",
            result.overall_level,
            result.total_score()
        ));

        md.push_str("| 维度 | 得分 |\n");
        md.push_str("|------|------|\n");
        md.push_str(&format!("| 语言（平均） | {:.2} |\n", scores.language_average));
        md.push_str(&format!("| 数学（平均） | {:.2} |\n", scores.math_average));
        md.push_str(&format!("| 社交能力 | {} |\n", scores.social));
        md.push_str(&format!("| 自理能力 | {} |\n", scores.self_care));
        md.push_str(&format!("| 运动能力 | {} |\n\n", scores.motor));

        push_section(&mut md, "优势", &result.strengths);
        push_section(&mut md, "需加强", &result.areas_to_improve);
        push_section(&mut md, "建议", &result.recommendations);

        md
    }

    /// Compare this report against an earlier one.
    pub fn compare(&self, baseline: &AssessmentReport) -> ProgressReport {
        let mut improved = Vec::new();
        let mut declined = Vec::new();
        let mut unchanged = 0usize;

        for dimension in Dimension::ALL {
            let change = ScoreChange {
                dimension,
                baseline: baseline.profile.score(dimension).get(),
                current: self.profile.score(dimension).get(),
            };
            match change.current.cmp(&change.baseline) {
                std::cmp::Ordering::Greater => improved.push(change),
                std::cmp::Ordering::Less => declined.push(change),
                std::cmp::Ordering::Equal => unchanged += 1,
            }
        }

        ProgressReport {
            improved,
            declined,
            unchanged,
            baseline_level: baseline.result.overall_level,
            current_level: self.result.overall_level,
            baseline_total: baseline.result.total_score(),
            current_total: self.result.total_score(),
            total_delta: self.result.total_score() - baseline.result.total_score(),
        }
    }
}

fn push_section(md: &mut String, heading: &str, items: &[String]) {
    md.push_str(&format!("### {heading}\n\n"));
    if items.is_empty() {
        md.push_str("- 无\n");
    }
    for item in items {
        md.push_str(&format!("- {item}\n"));
    }
    md.push('\n');
}

/// Change between two assessments of the same child.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressReport {
    /// Dimensions whose rating went up.
    pub improved: Vec<ScoreChange>,
    /// Dimensions whose rating went down.
    pub declined: Vec<ScoreChange>,
    /// Dimensions with the same rating.
    pub unchanged: usize,
    pub baseline_level: OverallLevel,
    pub current_level: OverallLevel,
    pub baseline_total: f64,
    pub current_total: f64,
    pub total_delta: f64,
}

/// One dimension's rating before and after.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreChange {
    pub dimension: Dimension,
    pub baseline: u8,
    pub current: u8,
}

impl ScoreChange {
    pub fn delta(&self) -> i16 {
        i16::from(self.current) - i16::from(self.baseline)
    }
}

impl ProgressReport {
    /// Format the progress report as markdown.
    pub fn to_markdown(&self) -> String {
        let mut md = String::new();

        md.push_str(&format!(
            "**整体水平：** {} → {}（总分 {:.2} → {:.2}，{:+.2}）\n\n",
            self.baseline_level,
            self.current_level,
            self.baseline_total,
            self.current_total,
            self.total_delta
        ));
        md.push_str(&format!(
            "**汇总：** {} 项进步，{} 项退步，{} 项持平\n\n",
            self.improved.len(),
            self.declined.len(),
            self.unchanged
        ));

        for (heading, changes) in [("进步", &self.improved), ("退步", &self.declined)] {
            if changes.is_empty() {
                continue;
            }
            md.push_str(&format!("### {heading}\n\n"));
            md.push_str("| 维度 | 之前 | 现在 | 变化 |\n");
            md.push_str("|------|------|------|------|\n");
            for c in changes {
                md.push_str(&format!(
                    "| {} | {} | {} | {:+} |\n",
                    c.dimension.title(),
                    c.baseline,
                    c.current,
                    c.delta()
                ));
            }
            md.push('\n');
        }

        md
    }

    /// Returns true if any rating went down.
    pub fn has_declines(&self) -> bool {
        !self.declined.is_empty()
    }
}
