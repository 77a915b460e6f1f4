//! Operator configuration: file, then environment.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

use std::path::{Path, PathBuf};
use std::time::Duration;

use calc_reconciler::{Admission, DefaultingPolicy, LoopConfig};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Log filter override.
pub const ENV_LOG: &str = "CALC_OPERATOR_LOG";
/// Loop interval override, in milliseconds.
pub const ENV_INTERVAL_MS: &str = "CALC_OPERATOR_INTERVAL_MS";
/// Defaulting policy override (`add` or `mul`).
pub const ENV_DEFAULTS: &str = "CALC_OPERATOR_DEFAULTS";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {reason}")]
    Parse { path: PathBuf, reason: String },

    #[error("invalid configuration: {reason}")]
    Invalid { reason: String },
}

impl ConfigError {
    fn parse(path: &Path, reason: impl ToString) -> Self {
        Self::Parse {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        }
    }

    fn invalid(reason: impl Into<String>) -> Self {
        Self::Invalid {
            reason: reason.into(),
        }
    }
}

/// Admission settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdmissionConfig {
    /// Named defaulting policy, `add` or `mul`.
    pub defaults: String,
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        Self {
            defaults: "add".to_string(),
        }
    }
}

/// Event log settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventsConfig {
    /// Events retained in memory.
    pub capacity: usize,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            capacity: calc_events::InMemoryEventLog::DEFAULT_CAPACITY,
        }
    }
}

/// Top-level operator configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OperatorConfig {
    /// Default `tracing` filter. `RUST_LOG` wins when set.
    pub log: String,
    pub reconciler: LoopConfig,
    pub admission: AdmissionConfig,
    pub events: EventsConfig,
}

impl Default for OperatorConfig {
    fn default() -> Self {
        Self {
            log: "info".to_string(),
            reconciler: LoopConfig::default(),
            admission: AdmissionConfig::default(),
            events: EventsConfig::default(),
        }
    }
}

impl OperatorConfig {
    /// Load configuration from a file.
    ///
    /// `.json` files are read as JSON, anything else as TOML.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Io` or `ConfigError::Parse`.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        if path.extension().is_some_and(|e| e == "json") {
            serde_json::from_str(&content).map_err(|e| ConfigError::parse(path, e))
        } else {
            toml::from_str(&content).map_err(|e| ConfigError::parse(path, e))
        }
    }

    /// Optional file, then environment, then validation.
    ///
    /// # Errors
    ///
    /// Returns any error of [`Self::from_file`], [`Self::with_env`] or
    /// [`Self::validate`].
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let base = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        let config = base.with_env(|name| std::env::var(name).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Overlay variables read through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` when the interval is not a number.
    pub fn with_env(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        if let Some(filter) = lookup(ENV_LOG) {
            self.log = filter;
        }

        if let Some(raw) = lookup(ENV_INTERVAL_MS) {
            let millis = raw.trim().parse::<u64>().map_err(|e| {
                ConfigError::invalid(format!("{ENV_INTERVAL_MS}='{raw}' is not a number: {e}"))
            })?;
            self.reconciler.interval = Duration::from_millis(millis);
        }

        if let Some(defaults) = lookup(ENV_DEFAULTS) {
            self.admission.defaults = defaults;
        }

        Ok(self)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` for a zero interval, a zero error budget,
    /// a zero event capacity or an unknown defaulting policy.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.reconciler.interval.is_zero() {
            return Err(ConfigError::invalid("reconciler interval must be greater than 0"));
        }

        if self.reconciler.max_errors == 0 {
            return Err(ConfigError::invalid("reconciler max_errors must be greater than 0"));
        }

        if self.events.capacity == 0 {
            return Err(ConfigError::invalid("events capacity must be greater than 0"));
        }

        self.defaulting_policy().map(|_| ())
    }

    /// Resolve the configured defaulting policy.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` for an unknown policy name.
    pub fn defaulting_policy(&self) -> Result<DefaultingPolicy, ConfigError> {
        DefaultingPolicy::named(&self.admission.defaults).map_err(|e| match e {
            calc_reconciler::Error::InvalidConfig { reason } => ConfigError::Invalid { reason },
            other => ConfigError::invalid(other.to_string()),
        })
    }

    /// Admission step for this configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` for an unknown policy name.
    pub fn admission(&self) -> Result<Admission, ConfigError> {
        self.defaulting_policy().map(Admission::new)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::expect_used)]

    use std::collections::HashMap;
    use std::io::Write;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name: &str| vars.get(name).cloned()
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = OperatorConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.log, "info");
        assert_eq!(config.defaulting_policy().unwrap(), DefaultingPolicy::additive());
    }

    #[test]
    fn test_from_toml_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
log = "calc_reconciler=debug"

[reconciler]
interval_ms = 500
stop_on_error = true

[admission]
defaults = "mul"
"#
        )
        .unwrap();

        let config = OperatorConfig::from_file(file.path()).unwrap();
        assert_eq!(config.log, "calc_reconciler=debug");
        assert_eq!(config.reconciler.interval, Duration::from_millis(500));
        assert!(config.reconciler.stop_on_error);
        assert_eq!(config.reconciler.max_errors, LoopConfig::default().max_errors);
        assert_eq!(
            config.defaulting_policy().unwrap(),
            DefaultingPolicy::multiplicative()
        );
    }

    #[test]
    fn test_from_json_file() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(file, r#"{{"events": {{"capacity": 5}}}}"#).unwrap();

        let config = OperatorConfig::from_file(file.path()).unwrap();
        assert_eq!(config.events.capacity, 5);
        assert_eq!(config.admission, AdmissionConfig::default());
    }

    #[test]
    fn test_malformed_file_reports_path() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        write!(file, "reconciler = [").unwrap();

        let err = OperatorConfig::from_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains(&file.path().display().to_string()));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = OperatorConfig::from_file(&dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_env_overrides_file_values() {
        let config = OperatorConfig::default()
            .with_env(env(&[
                (ENV_LOG, "debug"),
                (ENV_INTERVAL_MS, "250"),
                (ENV_DEFAULTS, "mul"),
            ]))
            .unwrap();
        assert_eq!(config.log, "debug");
        assert_eq!(config.reconciler.interval, Duration::from_millis(250));
        assert_eq!(config.admission.defaults, "mul");
    }

    #[test]
    fn test_bad_interval_env_is_rejected() {
        let err = OperatorConfig::default()
            .with_env(env(&[(ENV_INTERVAL_MS, "soon")]))
            .unwrap_err();
        assert!(err.to_string().contains(ENV_INTERVAL_MS));
    }

    #[test]
    fn test_validate_rejects_unknown_policy_and_zero_interval() {
        let mut config = OperatorConfig::default();
        config.admission.defaults = "div".to_string();
        assert!(config.validate().is_err());
        assert!(config.admission().is_err());

        let mut config = OperatorConfig::default();
        config.reconciler.interval = Duration::ZERO;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_event_capacity_is_rejected() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        write!(file, "[events]\ncapacity = 0\n").unwrap();

        let err = OperatorConfig::load(Some(file.path())).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { ref reason } if reason.contains("capacity")));
    }
}
