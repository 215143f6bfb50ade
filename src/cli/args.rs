use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "waqt", version, author, about = "Prayer-time reminders that keep firing in the background and offline")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show today's prayer times and countdown to next prayer
    Times,
    /// Run the reminder daemon with a live countdown (default)
    Run {
        /// Do not play the adhan cue at prayer time
        #[arg(long)]
        no_sound: bool,
        /// Do not print the countdown line
        #[arg(long)]
        quiet: bool,
    },
    /// Show the alarms the background context has persisted
    Alarms,
    /// Populate the offline asset cache from the configured origin
    Install,
    /// Serve one asset, cache first, to stdout or a file
    Serve {
        /// Asset path, e.g. /adhan.mp3
        path: String,
        /// Write to this file instead of stdout
        #[arg(long, short)]
        out: Option<PathBuf>,
    },
    /// Print the config file location, writing defaults if it does not exist
    Config,
}
