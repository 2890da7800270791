//! Command-line interface definition.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// icsbridge - Export an Outlook calendar to an iCalendar file
#[derive(Debug, Parser)]
#[command(name = "icsbridge")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, short, env = "ICSBRIDGE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable debug output
    #[arg(long, short = 'v')]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Export the calendar once
    Export {
        /// Print the run report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Export on the configured schedule until interrupted
    Run,

    /// Check that the destination directory is writable
    Check,

    /// Configuration commands
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Configuration actions.
#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Dump current configuration
    Dump,

    /// Validate configuration
    Validate,

    /// Show configuration file path
    Path,
}
