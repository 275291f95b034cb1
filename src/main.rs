//! Bearings CLI entry point.

use clap::Parser;

use bearings::cli::{handle_error, load_config, Cli, Commands};
use bearings::infrastructure::LoggerImpl;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = load_config(cli.config.as_deref()).unwrap_or_else(|err| handle_error(err, cli.json));
    let _logger = LoggerImpl::init(&config.logging).unwrap_or_else(|err| handle_error(err, cli.json));

    let result = match cli.command {
        Commands::Build(args) => bearings::cli::commands::build::execute(args, config, cli.json).await,
        Commands::List(args) => bearings::cli::commands::list::execute(args, config, cli.json).await,
    };

    if let Err(err) = result {
        handle_error(err, cli.json);
    }
}
