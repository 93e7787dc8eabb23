//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Multi-person engagement tracker.
///
/// Replays recorded skeleton and hand-pointer frames through the engagement
/// coordinator and prints the resulting user-state notifications.
#[derive(Debug, Parser)]
#[command(name = "ut", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Replay a JSON-lines frame recording and print user-state events.
    Replay {
        /// Frame file, one JSON frame per line. Use `-` for stdin.
        frames: PathBuf,

        /// Number of tracking slots to fill per frame (overrides config).
        #[arg(long)]
        slots: Option<usize>,

        /// Also print the candidate ranking for every frame.
        #[arg(long)]
        show_ranking: bool,
    },

    /// Print the effective configuration.
    Config,
}
