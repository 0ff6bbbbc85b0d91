// SPDX-FileCopyrightText: 2026 Relayr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Relayr - multi-channel communication server for CRM workloads.
//!
//! Binary entry point: webhook ingestion, queue workers, and channel
//! adapters under one process.

mod serve;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use relayr_config::RelayrConfig;

/// Relayr - multi-channel communication server.
#[derive(Parser, Debug)]
#[command(name = "relayr", version, about, long_about = None)]
struct Cli {
    /// Path to an explicit config file (overrides the search path).
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the ingestion server and queue workers.
    Serve,
    /// Print the resolved configuration.
    Config,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config: RelayrConfig = match &cli.config {
        Some(path) => relayr_config::load_config_from_path(path),
        None => relayr_config::load_config(),
    }
    .unwrap_or_else(|e| {
        eprintln!("relayr: failed to load configuration: {e}");
        std::process::exit(1);
    });

    match cli.command {
        Some(Commands::Serve) => match serve::run_serve(config).await {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("relayr serve: {e}");
                ExitCode::FAILURE
            }
        },
        Some(Commands::Config) => match toml::to_string_pretty(&config) {
            Ok(rendered) => {
                println!("{rendered}");
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("relayr config: failed to render configuration: {e}");
                ExitCode::FAILURE
            }
        },
        None => {
            println!("relayr: use --help for available commands");
            ExitCode::SUCCESS
        }
    }
}
