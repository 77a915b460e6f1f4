//! Calculator manifests: YAML documents or JSON.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

use std::path::{Path, PathBuf};

use calc_reconciler::{Calculator, KIND};
use serde::Deserialize;
use thiserror::Error;

/// Manifest loading errors.
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("failed to read manifest {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse manifest: {reason}")]
    Parse { reason: String },

    #[error("unsupported kind '{kind}' in manifest, expected '{}'", KIND)]
    UnsupportedKind { kind: String },
}

impl From<serde_yaml::Error> for ManifestError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::Parse {
            reason: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for ManifestError {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse {
            reason: err.to_string(),
        }
    }
}

/// Serialization format of a manifest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestFormat {
    Yaml,
    Json,
}

impl ManifestFormat {
    /// Pick the format from a file extension. Anything but `.json` is YAML.
    #[must_use]
    pub fn from_path(path: &Path) -> Self {
        if path.extension().is_some_and(|e| e == "json") {
            Self::Json
        } else {
            Self::Yaml
        }
    }
}

/// Read every Calculator in the manifest at `path`.
///
/// # Errors
///
/// Returns `ManifestError` when the file cannot be read or parsed.
pub fn load_manifest(path: &Path) -> Result<Vec<Calculator>, ManifestError> {
    let content = std::fs::read_to_string(path).map_err(|source| ManifestError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_manifest(&content, ManifestFormat::from_path(path))
}

/// Parse Calculators from manifest text.
///
/// YAML may hold several `---` separated documents. JSON may hold a single
/// object or an array of them.
///
/// # Errors
///
/// Returns `ManifestError::Parse` for malformed input and
/// `ManifestError::UnsupportedKind` for a resource that is not a Calculator.
pub fn parse_manifest(
    content: &str,
    format: ManifestFormat,
) -> Result<Vec<Calculator>, ManifestError> {
    let calculators = match format {
        ManifestFormat::Yaml => parse_yaml(content)?,
        ManifestFormat::Json => parse_json(content)?,
    };

    calculators
        .into_iter()
        .map(|calculator| {
            if calculator.kind == KIND {
                Ok(calculator)
            } else {
                Err(ManifestError::UnsupportedKind {
                    kind: calculator.kind,
                })
            }
        })
        .collect()
}

fn parse_yaml(content: &str) -> Result<Vec<Calculator>, ManifestError> {
    serde_yaml::Deserializer::from_str(content)
        .map(|document| serde_yaml::Value::deserialize(document))
        .filter(|document| !matches!(document, Ok(serde_yaml::Value::Null)))
        .map(|document| -> Result<Calculator, ManifestError> {
            Ok(serde_yaml::from_value(document?)?)
        })
        .collect()
}

fn parse_json(content: &str) -> Result<Vec<Calculator>, ManifestError> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        Many(Vec<Calculator>),
        One(Box<Calculator>),
    }

    Ok(match serde_json::from_str(content)? {
        OneOrMany::Many(calculators) => calculators,
        OneOrMany::One(calculator) => vec![*calculator],
    })
}
