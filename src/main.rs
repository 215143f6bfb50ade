mod assets;
mod background;
mod cli;
mod config;
mod db;
mod foreground;
mod models;
mod prayer_times;
mod utils;

use anyhow::{Context, Result};
use clap::Parser;

use cli::args::{Cli, Commands};
use cli::handlers;
use config::AppConfig;

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let config = AppConfig::load().context("Loading config")?;

    // Ensure data directory exists; every handler opens its own connections
    AppConfig::ensure_data_dir()?;
    let db_path = AppConfig::db_path()?;

    match cli.command {
        Some(Commands::Times) => handlers::handle_times(&config, &db_path)?,
        Some(Commands::Alarms) => handlers::handle_alarms(&config, &db_path)?,
        Some(Commands::Install) => handlers::handle_install(&config, &db_path)?,
        Some(Commands::Serve { path, out }) => {
            handlers::handle_serve(&config, &db_path, &path, out.as_deref())?
        }
        Some(Commands::Config) => handlers::handle_config(&config)?,
        Some(Commands::Run { no_sound, quiet }) => {
            handlers::handle_run(&config, &db_path, no_sound, quiet)?
        }
        // No subcommand → run the daemon
        None => handlers::handle_run(&config, &db_path, false, false)?,
    }

    Ok(())
}
