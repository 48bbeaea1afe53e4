//! The `xiaoqiao assess` command.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use comfy_table::{Cell, Table};

use xiaoqiao_core::model::Dimension;
use xiaoqiao_core::parser;
use xiaoqiao_core::report::AssessmentReport;

use super::OutputFormat;

pub fn execute(
    profile_path: PathBuf,
    format: OutputFormat,
    save: bool,
    output: Option<PathBuf>,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let profiles = if profile_path.is_dir() {
        parser::load_profile_directory(&profile_path)?
    } else {
        vec![(profile_path.clone(), parser::parse_profile(&profile_path)?)]
    };
    anyhow::ensure!(
        !profiles.is_empty(),
        "no profiles found in {}",
        profile_path.display()
    );

    let reports: Vec<(PathBuf, AssessmentReport)> = profiles
        .into_iter()
        .map(|(path, profile)| (path, AssessmentReport::new(profile)))
        .collect();

    match format {
        OutputFormat::Json => {
            if let [(_, report)] = reports.as_slice() {
                println!("{}", serde_json::to_string_pretty(report)?);
            } else {
                let all: Vec<&AssessmentReport> = reports.iter().map(|(_, r)| r).collect();
                println!("{}", serde_json::to_string_pretty(&all)?);
            }
        }
        OutputFormat::Markdown => {
            let sections: Vec<String> = reports.iter().map(|(_, r)| r.to_markdown()).collect();
            println!("{}", sections.join("\n---\n\n"));
        }
        OutputFormat::Text => {
            for (i, (_, report)) in reports.iter().enumerate() {
                if i > 0 {
                    println!();
                }
                print_summary(report);
            }
        }
    }

    if save {
        let output_dir = match output {
            Some(dir) => dir,
            None => xiaoqiao_providers::load_config_from(config_path.as_deref())?.output_dir,
        };
        for (path, report) in &reports {
            save_report(report, path, &output_dir)?;
        }
    }

    Ok(())
}

fn print_summary(report: &AssessmentReport) {
    let profile = &report.profile;
    let result = &report.result;

    match profile.age {
        Some(age) => println!("{}（{age} 岁）", profile.display_name()),
        None => println!("{}", profile.display_name()),
    }

    let mut table = Table::new();
    table.set_header(vec!["维度", "得分", ""]);
    for dimension in Dimension::ALL {
        let score = profile.score(dimension);
        let mark = if score.is_strength() {
            "优势"
        } else if score.needs_improvement() {
            "需加强"
        } else {
            ""
        };
        table.add_row(vec![
            Cell::new(dimension.title()),
            Cell::new(score),
            Cell::new(mark),
        ]);
    }
    println!("{table}");

    println!(
        "整体水平：{}（总分 {:.2}，语言 {:.2}，数学 {:.2}）",
        result.overall_level,
        result.total_score(),
        result.scores.language_average,
        result.scores.math_average
    );
    print_list("优势", &result.strengths);
    print_list("需加强", &result.areas_to_improve);
    print_list("建议", &result.recommendations);
}

fn print_list(heading: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    println!("{heading}：");
    for item in items {
        println!("  - {item}");
    }
}

fn save_report(report: &AssessmentReport, profile_path: &Path, output_dir: &Path) -> Result<()> {
    let stem = profile_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("profile");
    let id = report.id.to_string();
    let base = format!(
        "{stem}-{}-{}",
        report.created_at.format("%Y%m%d-%H%M%S"),
        &id[..8]
    );

    let json_path = output_dir.join(format!("{base}.json"));
    report
        .save_json(&json_path)
        .with_context(|| format!("failed to save report for {}", profile_path.display()))?;
    eprintln!("Results saved to {}", json_path.display());

    let html_path = output_dir.join(format!("{base}.html"));
    xiaoqiao_report::write_html_report(report, &html_path)?;
    eprintln!("HTML report: {}", html_path.display());

    Ok(())
}
