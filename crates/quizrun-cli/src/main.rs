//! quizrun CLI — take quizzes, review missed questions, and trace snippets.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use quizrun_core::model::Difficulty;
use quizrun_core::session::ProgressionMode;

mod commands;

#[derive(Parser)]
#[command(name = "quizrun", version, about = "Multiple-choice quiz runner")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Take a quiz interactively on stdin
    Take {
        /// Bank file, directory, or URL (repeatable; defaults to `banks` from config)
        #[arg(long)]
        bank: Vec<String>,

        /// Progression mode: batch or sequential
        #[arg(long)]
        mode: Option<ProgressionMode>,

        /// Only questions in this category
        #[arg(long)]
        category: Option<String>,

        /// Only questions of this difficulty
        #[arg(long)]
        difficulty: Option<Difficulty>,

        /// Review previously missed questions only
        #[arg(long, conflicts_with_all = ["category", "difficulty"])]
        wrong_only: bool,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Validate question bank files
    Validate {
        /// Bank file or directory
        #[arg(long)]
        bank: PathBuf,
    },

    /// Inspect or clear the wrong-answer store
    Wrong {
        #[command(subcommand)]
        action: commands::wrong::WrongAction,

        /// Config file path
        #[arg(long, global = true)]
        config: Option<PathBuf>,
    },

    /// Run a Python snippet with variable tracing
    Exec {
        /// Snippet file, or `-` for stdin
        #[arg(long)]
        file: PathBuf,

        /// Variables to trace (comma-separated; default: all top-level names)
        #[arg(long, value_delimiter = ',')]
        track: Vec<String>,

        /// Timeout in milliseconds (default: runner.timeout_ms from config)
        #[arg(long)]
        timeout_ms: Option<u64>,

        /// Write a PNG plot of a traced variable to this path
        #[arg(long)]
        plot: Option<PathBuf>,

        /// Variable to plot (default: first tracked variable)
        #[arg(long, requires = "plot")]
        plot_var: Option<String>,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Create starter config and an example question bank
    Init,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("quizrun=info")),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Take {
            bank,
            mode,
            category,
            difficulty,
            wrong_only,
            config,
        } => {
            commands::take::execute(commands::take::TakeOptions {
                banks: bank,
                mode,
                category,
                difficulty,
                wrong_only,
                config,
            })
            .await
        }
        Commands::Validate { bank } => commands::validate::execute(bank).await,
        Commands::Wrong { action, config } => commands::wrong::execute(action, config),
        Commands::Exec {
            file,
            track,
            timeout_ms,
            plot,
            plot_var,
            config,
        } => commands::exec::execute(file, track, timeout_ms, plot, plot_var, config).await,
        Commands::Init => commands::init::execute(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
