//! The `xiaoqiao init` command.

use std::path::Path;

use anyhow::{Context, Result};

pub fn execute() -> Result<()> {
    write_if_missing(Path::new("xiaoqiao.toml"), SAMPLE_CONFIG)?;

    std::fs::create_dir_all("profiles").context("failed to create profiles/")?;
    write_if_missing(Path::new("profiles/example.toml"), EXAMPLE_PROFILE)?;

    write_if_missing(Path::new("knowledge_base.md"), SAMPLE_KNOWLEDGE)?;

    println!("\nNext steps:");
    println!("  1. Export OPENAI_API_KEY or ANTHROPIC_API_KEY (optional, enables plan and Q&A)");
    println!("  2. Run: xiaoqiao validate --profile profiles/example.toml");
    println!("  3. Run: xiaoqiao assess --profile profiles/example.toml");
    println!("  4. Run: xiaoqiao plan --profile profiles/example.toml");

    Ok(())
}

fn write_if_missing(path: &Path, content: &str) -> Result<()> {
    if path.exists() {
        println!("{} already exists, skipping.", path.display());
    } else {
        std::fs::write(path, content)
            .with_context(|| format!("failed to write {}", path.display()))?;
        println!("Created {}", path.display());
    }
    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# xiaoqiao configuration

default_provider = "openai"
default_model = "gpt-4o"
temperature = 0.7
max_tokens = 1024
max_retries = 2
retry_delay_ms = 1000
knowledge_base = "knowledge_base.md"
retrieval_k = 3
output_dir = "./xiaoqiao-results"

[providers.openai]
type = "openai"
api_key = "${OPENAI_API_KEY}"

[providers.anthropic]
type = "anthropic"
api_key = "${ANTHROPIC_API_KEY}"
model = "claude-sonnet-4-20250514"
"#;

const EXAMPLE_PROFILE: &str = r#"# Ratings run from 1 (needs support) to 5 (very confident).
# Missing ratings count as 3.
name = "小明"
age = 5.5
interests = ["画画", "搭积木"]
concerns = ["上课坐不住"]
social = 4
self_care = 2
motor = 3

[language]
listening = 4
expression = 5
reading = 3
writing_interest = 3

[math]
counting = 5
operation = 3
shapes = 4
space = 3
"#;

const SAMPLE_KNOWLEDGE: &str = r#"# 幼小衔接知识库

## 作息调整

入学前一到两个月开始按小学作息起床和入睡，晚上九点前上床，保证十小时睡眠。
午睡时间逐步缩短，让孩子适应上午四节课的节奏。

## 自理能力

让孩子自己整理书包、削铅笔、系鞋带、收拾桌面。
可以和孩子一起制作"出门清单"，每天出门前对照检查。

## 专注力

从十分钟的安静活动开始，逐步延长到二十分钟。
拼图、走迷宫、听故事复述都是适合的专注力游戏。

## 拼音与识字

入学前不建议系统学习拼音，可以通过儿歌和游戏熟悉声母韵母。
亲子共读时指读绘本上的大字，培养对文字的兴趣。

## 情绪与社交

和孩子聊聊小学生活，参观学校，减少陌生感。
鼓励孩子主动和同学打招呼，遇到困难时知道向老师求助。
"#;
