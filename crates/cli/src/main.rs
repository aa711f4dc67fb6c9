//! Main entry point for the stallguard CLI
//!
//! Runs scripted data stall scenarios against the recovery controller and
//! validates recovery policy files.

use clap::Parser;
use stallguard_cli::cli::Cli;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = cli.execute().await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
