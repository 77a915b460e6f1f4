//! Command handlers behind the CLI.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

use std::path::Path;

use anyhow::{Context, Result, bail};
use calc_core::Verdict;
use calc_reconciler::Calculator;
use tracing::{info, warn};

use crate::cli::OutputFormat;
use crate::config::OperatorConfig;
use crate::manifest::load_manifest;
use crate::operator::Operator;

/// Validate then compute.
///
/// # Errors
///
/// Fails with every violation when the operands are rejected.
pub fn compute(operation: &str, operands: &[f64]) -> Result<f64> {
    calc_core::validate(operation, operands)
        .into_result()
        .with_context(|| format!("cannot compute {operation}"))?;
    let result = calc_core::compute(operation, operands)?;
    info!(operation, result, "Computed");
    Ok(result)
}

/// Validate without computing.
#[must_use]
pub fn validate(operation: &str, operands: &[f64]) -> Verdict {
    calc_core::validate(operation, operands)
}

/// Human-readable verdict, one violation per line.
#[must_use]
pub fn render_verdict(verdict: &Verdict) -> String {
    if verdict.is_ok() {
        return "valid".to_string();
    }
    verdict
        .violations()
        .iter()
        .map(|violation| format!("invalid: {violation}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Serialize Calculators in the requested format.
///
/// # Errors
///
/// Returns serialization failures.
pub fn render_calculators(calculators: &[Calculator], format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => serde_json::to_string_pretty(calculators)
            .context("Failed to render calculators as JSON"),
        OutputFormat::Yaml => calculators
            .iter()
            .map(|calculator| {
                serde_yaml::to_string(calculator).context("Failed to render calculator as YAML")
            })
            .collect::<Result<Vec<_>>>()
            .map(|documents| documents.join("---\n")),
    }
}

/// Admit a manifest and reconcile it once, or until Ctrl+C with `watch`.
///
/// Returns the rendered Calculators.
///
/// # Errors
///
/// Returns manifest, configuration and store errors. Denied or rejected
/// Calculators are reported, not returned as errors.
pub async fn reconcile(
    manifest: &Path,
    watch: bool,
    format: OutputFormat,
    config: &OperatorConfig,
) -> Result<String> {
    let calculators = load_manifest(manifest)
        .with_context(|| format!("Failed to load manifest {}", manifest.display()))?;
    let operator = Operator::new(config).context("Failed to initialize operator")?;

    for denied in operator.admit_all(calculators).await {
        warn!(key = %denied.key, error = %denied.error, "Skipping calculator");
    }

    if watch {
        watch_until_shutdown(&operator).await?;
    } else {
        let summary = operator
            .reconcile_once()
            .await
            .context("Reconciliation pass failed")?;
        info!(
            computed = summary.computed,
            rejected = summary.rejected,
            "Reconciliation pass complete"
        );
        if let Some((key, error)) = summary.errors.first() {
            bail!("reconciling {key} failed: {error}");
        }
    }

    render_calculators(&operator.calculators().await, format)
}

async fn watch_until_shutdown(operator: &Operator) -> Result<()> {
    let stopper = operator.stopper();
    let mut events = operator.subscribe();

    let printer = tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            println!(
                "{} {} {} {}",
                event.timestamp.to_rfc3339(),
                event.event_type,
                event.object,
                event.message
            );
        }
    });

    let shutdown = tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, stopping reconciliation"),
            Err(err) => warn!(error = %err, "Failed to listen for shutdown signal"),
        }
        stopper.stop();
    });

    let result = operator.run().await;
    shutdown.abort();
    printer.abort();
    result.context("Reconciliation loop failed")
}
