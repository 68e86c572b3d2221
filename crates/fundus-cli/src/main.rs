// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// fundus-prep — batch normalization of fundus photographs.
//
// Entry point. Initialises logging, parses the command line, and dispatches
// to the command implementations.

mod commands;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "fundus-prep")]
#[command(about = "Normalize fundus photographs for downstream analysis", long_about = None)]
struct Cli {
    /// JSON configuration file (defaults are used when omitted)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Normalize every image in a directory
    Run(RunArgs),

    /// Normalize a single image
    Normalize {
        /// Source image
        input: PathBuf,
        /// Destination; the encoding follows its extension
        output: PathBuf,
    },

    /// Load and check a configuration file
    Validate,

    /// Write the default configuration
    GenerateConfig {
        /// Output path for the configuration file
        #[arg(short, long, default_value = "fundus-prep.json")]
        output: PathBuf,
    },
}

#[derive(Args)]
struct RunArgs {
    /// Directory containing the raw images
    #[arg(short, long, default_value = "data/raw")]
    input: PathBuf,

    /// Directory for normalized images (created if missing)
    #[arg(short, long, default_value = "data/processed/all")]
    output: PathBuf,

    /// Label CSV with `image` and `level` columns
    #[arg(short, long)]
    labels: Option<PathBuf>,

    /// Input file extension
    #[arg(long)]
    extension: Option<String>,

    /// Images processed concurrently (1 = sequential)
    #[arg(short, long)]
    workers: Option<usize>,

    /// Successful images between progress reports
    #[arg(long)]
    report_interval: Option<u64>,

    /// Also write the final summary as JSON to this path
    #[arg(long)]
    summary_json: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    tracing::debug!("fundus-prep starting");

    match cli.command {
        Command::Run(args) => commands::run(cli.config.as_deref(), args),
        Command::Normalize { input, output } => {
            commands::normalize_one(cli.config.as_deref(), &input, &output)
        }
        Command::Validate => commands::validate(cli.config.as_deref()),
        Command::GenerateConfig { output } => commands::generate_config(&output),
    }
}
