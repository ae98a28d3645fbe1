//! Trialbench CLI entry point.

use clap::Parser;

use trialbench::cli::{commands, Cli, Commands};
use trialbench::infrastructure::config::ConfigLoader;
use trialbench::infrastructure::logging;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let json = cli.json;

    if let Err(err) = run(cli).await {
        trialbench::cli::handle_error(err, json);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Run(args) => {
            let config = match &args.config {
                Some(path) => ConfigLoader::load_from_file(path)?,
                None => ConfigLoader::load()?,
            };
            logging::init(&config.logging)?;
            commands::run::execute(args, config, cli.json).await
        }
    }
}
