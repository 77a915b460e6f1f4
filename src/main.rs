//! # calc-operator - entry point
//!
//! ## Startup
//!
//! 1. **Arguments** - parsed with clap
//! 2. **Configuration** - optional file, then `CALC_OPERATOR_*` variables
//! 3. **Tracing** - `RUST_LOG` wins over the configured filter
//! 4. **Command** - compute, validate or reconcile
//!
//! Logs go to stderr so command output on stdout stays machine-readable.

#![forbid(unsafe_code)]
#![forbid(clippy::unwrap_used)]
#![forbid(clippy::panic)]
#![deny(clippy::expect_used)]

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::debug;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use calc_operator::OperatorConfig;
use calc_operator::cli::{Cli, Commands};
use calc_operator::commands;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let config = OperatorConfig::load(cli.config.as_deref())
        .context("Failed to load configuration")?;

    init_tracing(&config.log);
    debug!(config = ?config, "Configuration loaded");

    match cli.command {
        Commands::Compute {
            operation,
            operands,
        } => {
            let result = commands::compute(&operation, &operands)?;
            println!("{result}");
            Ok(ExitCode::SUCCESS)
        }
        Commands::Validate {
            operation,
            operands,
        } => {
            let verdict = commands::validate(&operation, &operands);
            println!("{}", commands::render_verdict(&verdict));
            Ok(if verdict.is_ok() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        Commands::Reconcile {
            manifest,
            watch,
            output,
        } => {
            let rendered = commands::reconcile(&manifest, watch, output, &config).await?;
            print!("{rendered}");
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Initialize tracing subscriber with environment filter.
fn init_tracing(default_filter: &str) {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
