//! HTML report generator.
//!
//! Produces a self-contained HTML file with all CSS inlined.

use anyhow::{Context, Result};
use std::path::Path;

use xiaoqiao_core::assessment::OverallLevel;
use xiaoqiao_core::model::{Dimension, Score};
use xiaoqiao_core::report::AssessmentReport;

/// Escape a string for safe HTML insertion.
fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

fn level_class(level: OverallLevel) -> &'static str {
    match level {
        OverallLevel::Excellent => "level-green",
        OverallLevel::Good => "level-yellow",
        OverallLevel::NeedsAttention => "level-red",
    }
}

fn score_color(score: Score) -> &'static str {
    if score.is_strength() {
        "#22c55e"
    } else if score.needs_improvement() {
        "#ef4444"
    } else {
        "#eab308"
    }
}

/// Generate an HTML page for one assessment.
pub fn generate_html(report: &AssessmentReport) -> String {
    let result = &report.result;
    let name = html_escape(report.profile.display_name());
    let mut html = String::new();

    html.push_str("<!DOCTYPE html>\n<html lang=\"zh-CN\">\n<head>\n");
    html.push_str("<meta charset=\"utf-8\">\n");
    html.push_str("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n");
    html.push_str(&format!("<title>幼小衔接评估 · {name}</title>\n"));
    html.push_str("<style>\n");
    html.push_str(CSS);
    html.push_str("</style>\n");
    html.push_str("</head>\n<body>\n");

    // Header
    html.push_str("<header>\n");
    html.push_str(&format!("<h1>{name} 的幼小衔接评估</h1>\n"));
    let age = report
        .profile
        .age
        .map(|a| format!("{a} 岁 | "))
        .unwrap_or_default();
    html.push_str(&format!(
        "<p class=\"meta\">{}{} | 报告 {}</p>\n",
        age,
        report.created_at.format("%Y-%m-%d %H:%M:%S UTC"),
        report.id
    ));
    html.push_str("</header>\n");

    // Level banner
    html.push_str(&format!(
        "<section class=\"banner {}\">\n<h2>整体水平：{}</h2>\n<p>总分 {:.2}（语言 {:.2} + 数学 {:.2} + 社交 {} + 自理 {} + 运动 {}）</p>\n</section>\n",
        level_class(result.overall_level),
        result.overall_level,
        result.total_score(),
        result.scores.language_average,
        result.scores.math_average,
        result.scores.social,
        result.scores.self_care,
        result.scores.motor,
    ));

    // Scores
    html.push_str("<section class=\"scores\">\n<h2>各项得分</h2>\n");
    html.push_str(&generate_bar_chart(report));
    html.push_str("</section>\n");

    // Feedback lists
    html.push_str("<section class=\"feedback\">\n");
    for (heading, items) in [
        ("优势", &result.strengths),
        ("需加强", &result.areas_to_improve),
        ("建议", &result.recommendations),
    ] {
        html.push_str(&format!("<h2>{heading}</h2>\n<ul>\n"));
        if items.is_empty() {
            html.push_str("<li class=\"empty\">无</li>\n");
        }
        for item in items {
            html.push_str(&format!("<li>{}</li>\n", html_escape(item)));
        }
        html.push_str("</ul>\n");
    }
    html.push_str("</section>\n");

    // Raw JSON
    html.push_str("<section class=\"raw-data\">\n");
    html.push_str("<details>\n<summary>原始数据（JSON）</summary>\n");
    html.push_str("<pre><code>");
    html.push_str(
        &serde_json::to_string_pretty(report)
            .unwrap_or_default()
            .replace('&', "&amp;")
            .replace('<', "&lt;")
            .replace('>', "&gt;"),
    );
    html.push_str("</code></pre>\n");
    html.push_str("</details>\n</section>\n");

    html.push_str("</body>\n</html>");
    html
}

/// Write an HTML report to a file.
pub fn write_html_report(report: &AssessmentReport, path: &Path) -> Result<()> {
    let html = generate_html(report);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, html)
        .with_context(|| format!("failed to write HTML report to {}", path.display()))?;
    Ok(())
}

/// Horizontal bars, one per dimension, scaled to the 1–5 range.
fn generate_bar_chart(report: &AssessmentReport) -> String {
    let bar_height = 24;
    let max_width = 400;
    let padding = 8;
    let label_width = 120;

    let total_height = Dimension::ALL.len() * (bar_height + padding) + padding;

    let mut svg = format!(
        "<svg width=\"{}\" height=\"{}\" xmlns=\"http://www.w3.org/2000/svg\">\n",
        label_width + max_width + 40,
        total_height
    );

    for (i, dimension) in Dimension::ALL.into_iter().enumerate() {
        let score = report.profile.score(dimension);
        let y = i * (bar_height + padding) + padding;
        let width = usize::from(score.get()) * max_width / usize::from(Score::MAX.get());

        svg.push_str(&format!(
            "  <text x=\"{}\" y=\"{}\" font-size=\"14\" fill=\"currentColor\" text-anchor=\"end\" dominant-baseline=\"middle\">{}</text>\n",
            label_width - 10,
            y + bar_height / 2,
            dimension.title()
        ));
        svg.push_str(&format!(
            "  <rect x=\"{}\" y=\"{}\" width=\"{}\" height=\"{}\" fill=\"{}\" rx=\"4\"><title>{}</title></rect>\n",
            label_width,
            y,
            width,
            bar_height,
            score_color(score),
            dimension.path()
        ));
        svg.push_str(&format!(
            "  <text x=\"{}\" y=\"{}\" font-size=\"12\" fill=\"currentColor\" dominant-baseline=\"middle\">{}/5</text>\n",
            label_width + width + 8,
            y + bar_height / 2,
            score
        ));
    }

    svg.push_str("</svg>\n");
    svg
}

const CSS: &str = r#"
:root { --bg: #fff; --fg: #1a1a1a; --border: #e5e7eb; --green: #dcfce7; --yellow: #fef9c3; --red: #fde2e2; }
@media (prefers-color-scheme: dark) {
  :root { --bg: #111827; --fg: #f9fafb; --border: #374151; --green: #064e3b; --yellow: #713f12; --red: #7f1d1d; }
}
body { font-family: -apple-system, BlinkMacSystemFont, 'PingFang SC', 'Microsoft YaHei', sans-serif; margin: 0; padding: 2rem; background: var(--bg); color: var(--fg); }
h1, h2 { margin-top: 1.5rem; }
.meta { color: #6b7280; }
.banner { padding: 1rem 1.5rem; border-radius: 8px; border: 1px solid var(--border); }
.banner h2 { margin-top: 0; }
.level-green { background: var(--green); }
.level-yellow { background: var(--yellow); }
.level-red { background: var(--red); }
li.empty { color: #6b7280; }
pre { overflow-x: auto; padding: 1rem; background: var(--border); border-radius: 8px; }
code { font-family: 'JetBrains Mono', 'Fira Code', monospace; font-size: 0.85rem; }
details { margin: 1rem 0; }
summary { cursor: pointer; font-weight: bold; }
svg { margin: 1rem 0; }
"#;
