use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use dejavu::core::log::init_logging;
use std::path::PathBuf;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    /// Sales file to analyse instead of the configured default dataset
    #[arg(short, long, global = true)]
    file: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Display the KPI snapshot
    Snapshot {
        /// Print the snapshot as JSON
        #[arg(long)]
        json: bool,
        /// Number of countries to show at each end of the ranking
        #[arg(short, long)]
        top: Option<usize>,
    },
    /// Display a preview of the dataset
    Analysis {
        /// Number of rows to preview
        #[arg(short, long)]
        rows: Option<usize>,
        /// Also show the dataset shape and descriptive statistics
        #[arg(short, long)]
        shape: bool,
    },
    /// Describe the dashboard
    About,
}

impl From<Commands> for dejavu::AppCommand {
    fn from(cmd: Commands) -> dejavu::AppCommand {
        match cmd {
            Commands::Snapshot { json, top } => dejavu::AppCommand::Snapshot { json, top },
            Commands::Analysis { rows, shape } => dejavu::AppCommand::Analysis { rows, shape },
            Commands::About => dejavu::AppCommand::About,
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => match cli.config_path.as_deref() {
            Some(path) => dejavu::cli::setup::setup_at_path(path),
            None => dejavu::cli::setup::setup(),
        },
        Some(cmd) => dejavu::run_command(
            cmd.into(),
            cli.config_path.as_deref(),
            cli.file.as_deref(),
        ),
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}
