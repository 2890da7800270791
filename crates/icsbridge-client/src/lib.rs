//! CLI, TOML configuration, export commands
//!
//! This crate provides the `icsbridge` command-line interface.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;

pub use cli::Cli;
pub use error::{ClientError, ClientResult};
