use clap::ValueEnum;

pub mod ask;
pub mod assess;
pub mod compare;
pub mod init;
pub mod list_models;
pub mod plan;
pub mod validate;

/// Output format for `assess` and `compare`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
    #[value(alias = "md")]
    Markdown,
}

/// Output format for `plan`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PlanFormat {
    #[value(alias = "md")]
    Markdown,
    Json,
}
