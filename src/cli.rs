//! CLI command definitions using clap.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// calc-operator - converges Calculator resources to their computed status
#[derive(Parser, Debug)]
#[command(name = "calc-operator")]
#[command(version)]
#[command(about = "Validate, compute and reconcile Calculator resources")]
#[command(
    long_about = "calc-operator validates operands against per-operation rules, computes results, and reconciles Calculator manifests into observed status."
)]
pub struct Cli {
    /// Configuration file (TOML, or JSON by extension)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Validate operands and compute the result
    Compute {
        /// Operation code (add, sub, mul, div, fact, log, exp, sin, cos, sinh, cosh)
        operation: String,

        /// Operands, in order
        #[arg(allow_negative_numbers = true)]
        operands: Vec<f64>,
    },

    /// Validate operands and list every violation
    Validate {
        /// Operation code
        operation: String,

        /// Operands, in order
        #[arg(allow_negative_numbers = true)]
        operands: Vec<f64>,
    },

    /// Admit and reconcile the Calculators in a manifest
    Reconcile {
        /// Manifest file (YAML documents, or JSON by extension)
        #[arg(short, long)]
        manifest: PathBuf,

        /// Keep reconciling on the configured interval until Ctrl+C
        #[arg(short, long, default_value_t = false)]
        watch: bool,

        /// Output format for the reconciled Calculators
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Yaml)]
        output: OutputFormat,
    },
}

/// Output format for rendered resources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Yaml,
    Json,
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::panic)]

    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_compute_accepts_negative_operands() {
        let cli = Cli::try_parse_from(["calc-operator", "compute", "exp", "-2", "3"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Compute { ref operation, ref operands }
                if operation == "exp" && operands == &[-2.0, 3.0]
        ));
    }

    #[test]
    fn test_reconcile_defaults() {
        let cli = Cli::try_parse_from([
            "calc-operator",
            "reconcile",
            "--manifest",
            "calculators.yaml",
            "--config",
            "operator.toml",
        ])
        .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("operator.toml")));
        assert!(matches!(
            cli.command,
            Commands::Reconcile { watch: false, output: OutputFormat::Yaml, .. }
        ));
    }
}
