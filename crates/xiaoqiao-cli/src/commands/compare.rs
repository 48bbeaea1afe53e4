//! The `xiaoqiao compare` command.

use std::path::PathBuf;

use anyhow::Result;

use xiaoqiao_core::report::{AssessmentReport, ScoreChange};

use super::OutputFormat;

pub fn execute(
    baseline_path: PathBuf,
    current_path: PathBuf,
    fail_on_decline: bool,
    format: OutputFormat,
) -> Result<()> {
    let baseline = AssessmentReport::load_json(&baseline_path)?;
    let current = AssessmentReport::load_json(&current_path)?;

    let progress = current.compare(&baseline);

    match format {
        OutputFormat::Markdown => {
            println!("{}", progress.to_markdown());
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&progress)?);
        }
        OutputFormat::Text => {
            println!(
                "Comparison: {} improved, {} declined, {} unchanged",
                progress.improved.len(),
                progress.declined.len(),
                progress.unchanged
            );
            println!(
                "Level: {} -> {} (total {:.2} -> {:.2}, {:+.2})",
                progress.baseline_level,
                progress.current_level,
                progress.baseline_total,
                progress.current_total,
                progress.total_delta
            );
            print_changes("Declined", &progress.declined);
            print_changes("Improved", &progress.improved);
        }
    }

    if fail_on_decline && progress.has_declines() {
        std::process::exit(1);
    }

    Ok(())
}

fn print_changes(heading: &str, changes: &[ScoreChange]) {
    if changes.is_empty() {
        return;
    }
    println!("\n{heading}:");
    for change in changes {
        println!(
            "  {} {} -> {} ({:+})",
            change.dimension.title(),
            change.baseline,
            change.current,
            change.delta()
        );
    }
}
