//! quizwright CLI, the user-facing command-line interface.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "quizwright", version, about = "Budget-constrained assessment builder")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create starter config and example blueprint
    Init,

    /// Validate a blueprint and show its budget usage
    Validate {
        /// Path to blueprint .toml
        #[arg(long)]
        blueprint: PathBuf,
    },

    /// Fetch learning outcomes for chapters
    Outcomes {
        /// Chapters as "id:name" pairs, comma-separated
        #[arg(long)]
        chapters: String,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Build an assessment document from a blueprint
    Build {
        /// Path to blueprint .toml
        #[arg(long)]
        blueprint: PathBuf,

        /// Output directory (defaults to the configured output_dir)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Override numbering: continuous or reset-per-section
        #[arg(long)]
        numbering: Option<String>,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    let filter = tracing_subscriber::EnvFilter::from_default_env();
    let filter = match "quizwright=info".parse() {
        Ok(directive) => filter.add_directive(directive),
        Err(_) => filter,
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Init => commands::init::execute(),
        Commands::Validate { blueprint } => commands::validate::execute(blueprint),
        Commands::Outcomes { chapters, config } => {
            commands::outcomes::execute(chapters, config).await
        }
        Commands::Build {
            blueprint,
            output,
            numbering,
            config,
        } => commands::build::execute(blueprint, output, numbering, config).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
