//! Command-line interface definition

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::commands;
use crate::logging::{parse_log_level, setup_logging, LoggingConfig};

/// Data stall recovery scenario runner
#[derive(Parser, Debug)]
#[command(name = "stallguard", author, version, about, long_about = None)]
pub struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Include file and line in log lines
    #[arg(long, global = true)]
    pub file_info: bool,

    /// Log span open and close events
    #[arg(long, global = true)]
    pub log_spans: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Play a scenario against a recovery policy
    Run {
        /// Recovery policy TOML file
        #[arg(short, long)]
        policy: PathBuf,

        /// Scenario TOML file
        #[arg(short, long)]
        scenario: PathBuf,

        /// Report format
        #[arg(long, value_enum, default_value_t = ReportFormat::Text)]
        format: ReportFormat,
    },

    /// Validate a recovery policy and print its step table
    Check {
        /// Recovery policy TOML file
        #[arg(short, long)]
        policy: PathBuf,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Text,
    Json,
}

impl Cli {
    /// Install logging and run the selected command
    pub async fn execute(self) -> anyhow::Result<()> {
        let level = parse_log_level(&self.log_level)?;
        setup_logging(
            &LoggingConfig::new(level)
                .with_json(self.json)
                .with_file_info(self.file_info)
                .with_spans(self.log_spans),
        )?;

        match self.command {
            Commands::Run {
                policy,
                scenario,
                format,
            } => commands::run::execute(&policy, &scenario, format).await,
            Commands::Check { policy } => commands::check::execute(&policy),
        }
    }
}
