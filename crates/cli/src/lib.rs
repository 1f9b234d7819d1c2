pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "corey",
    about = "Corey support console",
    long_about = "Drive the Corey support console: chat with the support agent, process \
                  approval decisions, and check configuration readiness.",
    after_help = "Examples:\n  corey chat --sample-data\n  corey doctor --json"
)]
pub struct Cli {
    #[arg(long, global = true, help = "Path to corey.toml")]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Start an interactive support session against the configured agents")]
    Chat {
        #[arg(long, help = "Seed the session with deterministic demo data")]
        sample_data: bool,
    },
    #[command(about = "Validate configuration and report agent readiness")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
}

pub async fn run() -> ExitCode {
    let cli = Cli::parse();

    match cli.command {
        Command::Chat { sample_data } => commands::chat::run(cli.config, sample_data).await,
        Command::Doctor { json } => commands::doctor::run(cli.config, json),
    }
}
