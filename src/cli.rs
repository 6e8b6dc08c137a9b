use std::path::PathBuf;

use clap::Parser;

use crate::cmd::Commands;

/// Field job dispatch and approval from the terminal.
/// Data lives in ~/.fieldops unless --db or --config say otherwise.
#[derive(Parser)]
#[command(name = "fo", version, about = "Field service task workflow CLI")]
pub struct Cli {
    /// Path to the JSON database file.
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Path to the settings file.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Employee id to act as.
    #[arg(long = "as", global = true, env = "FIELDOPS_USER")]
    pub user: Option<String>,

    /// Log progress to stderr (repeat for more detail).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}
