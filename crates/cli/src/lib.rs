pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::anyhow;
use clap::{Parser, Subcommand};
use deckfill_core::config::{AppConfig, LoadOptions, LogFormat};
use tracing::Level;

use crate::commands::fill::FillArgs;

#[derive(Debug, Parser)]
#[command(
    name = "deckfill",
    about = "Fill commercial proposal presentations from templates",
    long_about = "Generate commercial proposal decks from PPTX templates: company name, pricing table and price summary are filled in place, then optionally rendered to PDF.",
    after_help = "Examples:\n  deckfill sample\n  deckfill fill --company \"ООО Ромашка\" --hr-licenses 2 --employee-licenses 50\n  deckfill fill --variant long --request request.json --pdf\n  deckfill doctor --json"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Fill a template for one client and write the proposal")]
    Fill(FillArgs),
    #[command(about = "Inspect effective configuration values with source attribution")]
    Config {
        #[arg(long)]
        config: Option<PathBuf>,
    },
    #[command(about = "Check configuration, templates and the PDF converter")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
        #[arg(long)]
        config: Option<PathBuf>,
    },
    #[command(about = "Write built-in sample templates for every variant")]
    Sample {
        #[arg(long, help = "Target directory (defaults to the configured templates dir)")]
        dir: Option<PathBuf>,
        #[arg(long, help = "Overwrite templates that already exist")]
        force: bool,
        #[arg(long)]
        config: Option<PathBuf>,
    },
    #[command(about = "Delete generated files older than the retention window")]
    Cleanup {
        #[arg(long, help = "Retention window in seconds (defaults to cleanup.retention_secs)")]
        retention_secs: Option<u64>,
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

impl Command {
    fn config_path(&self) -> Option<PathBuf> {
        match self {
            Self::Fill(args) => args.config.clone(),
            Self::Config { config }
            | Self::Doctor { config, .. }
            | Self::Sample { config, .. }
            | Self::Cleanup { config, .. } => config.clone(),
        }
    }
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    // A broken config still gets logging; the command reports the failure.
    let logging_config = AppConfig::load(LoadOptions {
        config_path: cli.command.config_path(),
        ..LoadOptions::default()
    })
    .unwrap_or_default();
    if let Err(error) = init_logging(&logging_config) {
        eprintln!("logging disabled: {error}");
    }

    let result = match cli.command {
        Command::Fill(args) => commands::fill::run(args),
        Command::Config { config } => commands::config::run(config),
        Command::Doctor { json, config } => commands::doctor::run(json, config),
        Command::Sample { dir, force, config } => commands::sample::run(dir, force, config),
        Command::Cleanup { retention_secs, config } => {
            commands::cleanup::run(retention_secs, config)
        }
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}

/// Logs go to stderr so stdout stays a single machine-readable outcome.
fn init_logging(config: &AppConfig) -> anyhow::Result<()> {
    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);
    let builder = tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(log_level)
        .with_writer(std::io::stderr);

    let installed = match config.logging.format {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    installed.map_err(|error| anyhow!(error))
}
