//! Command-line interface for driving a screening run from a terminal.

pub mod commands;
pub mod output;

use clap::{Parser, Subcommand};
use console::style;

/// Cognitive-screening trial engine.
#[derive(Debug, Parser)]
#[command(name = "trialbench", version, about)]
pub struct Cli {
    /// Emit machine-readable JSON instead of formatted output
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run a full screening session against the configured backend
    Run(commands::run::RunArgs),
}

/// Print an error the way the rest of the CLI prints, then exit non-zero.
pub fn handle_error(err: anyhow::Error, json: bool) -> ! {
    if json {
        let payload = serde_json::json!({ "error": format!("{err:#}") });
        eprintln!("{payload}");
    } else {
        eprintln!("{} {err:#}", style("error:").red().bold());
    }
    std::process::exit(1);
}
