use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use ut_cli::commands::{self, replay};
use ut_cli::{Cli, Commands, Config};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing with verbose flag support
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    // Logs go to stderr so replayed events stay clean on stdout
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    let config =
        Config::load_from(cli.config.as_deref()).context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");

    let mut stdout = std::io::stdout().lock();
    match &cli.command {
        Some(Commands::Replay {
            frames,
            slots,
            show_ranking,
        }) => {
            let options = replay::ReplayOptions {
                slots: *slots,
                show_ranking: *show_ranking,
            };
            replay::run(&mut stdout, &config, frames, options)?;
        }
        Some(Commands::Config) => {
            commands::config::run(&mut stdout, &config)?;
        }
        None => {
            // No subcommand, show help
            use clap::CommandFactory;
            Cli::command().print_help()?;
            println!();
        }
    }

    Ok(())
}
