//! Progress tracking integration tests.
//!
//! Saves assessments to disk, reloads them and checks what the comparison
//! reports between two sittings.

use xiaoqiao_core::assessment::OverallLevel;
use xiaoqiao_core::model::{AbilityProfile, Dimension, Score};
use xiaoqiao_core::report::AssessmentReport;

fn sitting(profile: AbilityProfile) -> AssessmentReport {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("report.json");
    AssessmentReport::new(profile).save_json(&path).unwrap();
    AssessmentReport::load_json(&path).unwrap()
}

fn child(score: Score) -> AbilityProfile {
    let mut profile = AbilityProfile::uniform(score);
    profile.name = "小明".into();
    profile
}

#[test]
fn reload_preserves_assessment() {
    let original = AssessmentReport::new(child(Score::MAX).with(Dimension::SelfCare, Score::MIN));
    let loaded = sitting(original.profile.clone());

    assert_eq!(loaded.profile, original.profile);
    assert_eq!(loaded.result, original.result);
    assert_eq!(loaded.result.areas_to_improve, vec!["自理能力"]);
}

#[test]
fn detect_decline_in_one_dimension() {
    let baseline = sitting(child(Score::NEUTRAL));
    let current = sitting(child(Score::NEUTRAL).with(Dimension::Motor, Score::MIN));

    let progress = current.compare(&baseline);

    assert!(progress.has_declines());
    assert_eq!(progress.declined.len(), 1);
    assert_eq!(progress.declined[0].dimension, Dimension::Motor);
    assert_eq!(progress.declined[0].delta(), -2);
    assert_eq!(progress.unchanged, 10);
    assert!((progress.total_delta + 2.0).abs() < 1e-9);
}

#[test]
fn detect_improvement_across_levels() {
    let baseline = sitting(child(Score::MIN));
    let current = sitting(child(Score::MAX));

    let progress = current.compare(&baseline);

    assert!(!progress.has_declines());
    assert_eq!(progress.improved.len(), Dimension::ALL.len());
    assert_eq!(progress.baseline_level, OverallLevel::NeedsAttention);
    assert_eq!(progress.current_level, OverallLevel::Excellent);
    assert!((progress.total_delta - 20.0).abs() < 1e-9);
}

#[test]
fn language_swap_keeps_average_but_lists_both_changes() {
    let baseline = sitting(
        child(Score::NEUTRAL)
            .with(Dimension::Listening, Score::MAX)
            .with(Dimension::Reading, Score::MIN),
    );
    let current = sitting(
        child(Score::NEUTRAL)
            .with(Dimension::Listening, Score::MIN)
            .with(Dimension::Reading, Score::MAX),
    );

    let progress = current.compare(&baseline);

    assert_eq!(progress.improved.len(), 1);
    assert_eq!(progress.declined.len(), 1);
    assert_eq!(progress.baseline_level, progress.current_level);
    assert!(progress.total_delta.abs() < 1e-9);
}

#[test]
fn identical_sittings_are_unchanged() {
    let report = sitting(child(Score::NEUTRAL));
    let progress = report.compare(&report);

    assert!(progress.improved.is_empty());
    assert!(!progress.has_declines());
    assert_eq!(progress.unchanged, Dimension::ALL.len());
}

#[test]
fn markdown_lists_declines() {
    let baseline = sitting(child(Score::MAX));
    let current = sitting(child(Score::MAX).with(Dimension::Motor, Score::NEUTRAL));

    let md = current.compare(&baseline).to_markdown();

    assert!(md.contains("### 退步"));
    assert!(md.contains("| 运动能力 | 5 | 3 | -2 |"));
    assert!(md.contains("0 项进步，1 项退步，10 项持平"));
    assert!(!md.contains("### 进步"));
}
