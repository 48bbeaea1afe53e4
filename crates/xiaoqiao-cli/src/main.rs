//! xiaoqiao CLI: kindergarten-to-primary transition assessment and planning.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

use commands::{OutputFormat, PlanFormat};

#[derive(Parser)]
#[command(
    name = "xiaoqiao",
    version,
    about = "Kindergarten-to-primary transition assessment and planning"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Assess a child profile (or a directory of profiles)
    Assess {
        /// Path to a .toml/.json profile or a directory of profiles
        #[arg(long)]
        profile: PathBuf,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,

        /// Save JSON and HTML reports
        #[arg(long)]
        save: bool,

        /// Output directory for saved reports (default: from config)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Assess a child and generate a transition plan
    Plan {
        /// Path to a .toml/.json profile
        #[arg(long)]
        profile: PathBuf,

        /// Plan length
        #[arg(long, default_value = xiaoqiao_core::plan::DEFAULT_DURATION)]
        duration: String,

        /// Output format
        #[arg(long, value_enum, default_value_t = PlanFormat::Markdown)]
        format: PlanFormat,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Ask a transition question
    Ask {
        /// The question
        question: String,

        /// Knowledge base markdown file (default: from config)
        #[arg(long)]
        knowledge_base: Option<PathBuf>,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Compare two saved assessment reports
    Compare {
        /// Baseline report JSON
        #[arg(long)]
        baseline: PathBuf,

        /// Current report JSON
        #[arg(long)]
        current: PathBuf,

        /// Exit code 1 if any rating declined
        #[arg(long)]
        fail_on_decline: bool,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Check profile files for missing or malformed ratings
    Validate {
        /// Path to a profile file or directory
        #[arg(long)]
        profile: PathBuf,
    },

    /// List available models
    ListModels {
        /// Filter to specific provider
        #[arg(long)]
        provider: Option<String>,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Create starter config, example profile and knowledge base
    Init,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("xiaoqiao=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Assess {
            profile,
            format,
            save,
            output,
            config,
        } => commands::assess::execute(profile, format, save, output, config),
        Commands::Plan {
            profile,
            duration,
            format,
            config,
        } => commands::plan::execute(profile, duration, format, config).await,
        Commands::Ask {
            question,
            knowledge_base,
            config,
        } => commands::ask::execute(question, knowledge_base, config).await,
        Commands::Compare {
            baseline,
            current,
            fail_on_decline,
            format,
        } => commands::compare::execute(baseline, current, fail_on_decline, format),
        Commands::Validate { profile } => commands::validate::execute(profile),
        Commands::ListModels { provider, config } => {
            commands::list_models::execute(provider, config)
        }
        Commands::Init => commands::init::execute(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
