//! # calc-operator
//!
//! Converges Calculator resources to their computed status.
//!
//! This library wires the workspace crates into a runnable operator:
//! configuration, manifest loading, admission, the reconciliation loop and
//! the command handlers behind the CLI.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod cli;
pub mod commands;
pub mod config;
pub mod manifest;
pub mod operator;

// Re-export workspace crates
pub use calc_core;
pub use calc_events;
pub use calc_reconciler;

pub use config::{ConfigError, OperatorConfig};
pub use manifest::{ManifestError, ManifestFormat, load_manifest, parse_manifest};
pub use operator::{Denied, Operator};
