//! CLI interface and argument parsing
//!
//! This module provides the command-line interface for Custodian using clap.

pub mod commands;

use clap::{Parser, Subcommand};

/// Custodian - GDPR processing register runner
#[derive(Parser, Debug)]
#[command(name = "custodian")]
#[command(version, about, long_about = None)]
#[command(author = "Custodian Contributors")]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "custodian.toml", env = "CUSTODIAN_CONFIG")]
    pub config: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "CUSTODIAN_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Archive and anonymize records past their retention period
    Run(commands::run::RunArgs),

    /// Validate configuration file (and optionally the stored registers)
    ValidateConfig(commands::validate::ValidateArgs),

    /// Show registers and their recent processing logs
    Status(commands::status::StatusArgs),

    /// Initialize a new configuration file
    Init(commands::init::InitArgs),
}
