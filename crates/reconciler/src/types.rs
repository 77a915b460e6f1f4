//! Resource model: identity, desired state, observed state.

use std::fmt;

use serde::{Deserialize, Serialize};

/// API group/version written on every Calculator.
pub const API_VERSION: &str = "webapp.demo.calc-operator/v1";
/// Kind written on every Calculator.
pub const KIND: &str = "Calculator";
/// Namespace used when none is given.
pub const DEFAULT_NAMESPACE: &str = "default";

/// External identity of a Calculator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectKey {
    pub namespace: String,
    pub name: String,
}

impl ObjectKey {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

fn default_namespace() -> String {
    DEFAULT_NAMESPACE.to_string()
}

/// Object metadata kept by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMeta {
    pub name: String,
    #[serde(default = "default_namespace")]
    pub namespace: String,
    /// Bumped by the store on every write, spec or status.
    #[serde(default)]
    pub resource_version: u64,
    /// Bumped by the store on every spec change.
    #[serde(default)]
    pub generation: u64,
}

impl ObjectMeta {
    #[must_use]
    pub fn key(&self) -> ObjectKey {
        ObjectKey::new(self.namespace.clone(), self.name.clone())
    }
}

/// Desired state: the requested operation and its operands.
///
/// The operation stays textual so an unrecognised code still reaches
/// validation and ends up in the observed state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CalculatorSpec {
    #[serde(default)]
    pub operation: String,
    #[serde(default)]
    pub operands: Vec<f64>,
}

impl CalculatorSpec {
    pub fn new(operation: impl Into<String>, operands: impl Into<Vec<f64>>) -> Self {
        Self {
            operation: operation.into(),
            operands: operands.into(),
        }
    }
}

/// Outcome recorded by the last reconciliation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatusKind {
    #[default]
    #[serde(rename = "")]
    Unset,
    #[serde(rename = "success")]
    Success,
    #[serde(rename = "failed")]
    Failed,
}

impl fmt::Display for StatusKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unset => f.write_str("unset"),
            Self::Success => f.write_str("success"),
            Self::Failed => f.write_str("failed"),
        }
    }
}

/// Observed state.
///
/// Built only through [`CalculatorStatus::success`] or
/// [`CalculatorStatus::failed`], so at most one of `reason` and `result`
/// carries meaning and the other stays at its zero value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CalculatorStatus {
    #[serde(default)]
    status: StatusKind,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    reason: String,
    #[serde(default, with = "result_value")]
    result: f64,
}

/// `result` on the wire. JSON has no NaN or infinity, so non-finite values
/// are written as the strings `NaN`, `Infinity` and `-Infinity`.
mod result_value {
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    const NAN: &str = "NaN";
    const INFINITY: &str = "Infinity";
    const NEG_INFINITY: &str = "-Infinity";

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Number(f64),
        Text(String),
    }

    #[allow(clippy::trivially_copy_pass_by_ref)]
    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_nan() {
            serializer.serialize_str(NAN)
        } else if value.is_infinite() && value.is_sign_positive() {
            serializer.serialize_str(INFINITY)
        } else if value.is_infinite() {
            serializer.serialize_str(NEG_INFINITY)
        } else {
            serializer.serialize_f64(*value)
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        match Repr::deserialize(deserializer)? {
            Repr::Number(value) => Ok(value),
            Repr::Text(text) => match text.as_str() {
                NAN => Ok(f64::NAN),
                INFINITY => Ok(f64::INFINITY),
                NEG_INFINITY => Ok(f64::NEG_INFINITY),
                other => Err(D::Error::custom(format!(
                    "expected a number, {NAN}, {INFINITY} or {NEG_INFINITY}, found '{other}'"
                ))),
            },
        }
    }
}

impl CalculatorStatus {
    #[must_use]
    pub const fn success(result: f64) -> Self {
        Self {
            status: StatusKind::Success,
            reason: String::new(),
            result,
        }
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        Self {
            status: StatusKind::Failed,
            reason: reason.into(),
            result: 0.0,
        }
    }

    #[must_use]
    pub const fn status(&self) -> StatusKind {
        self.status
    }

    /// Failure detail, present only when the status is `failed`.
    #[must_use]
    pub fn reason(&self) -> Option<&str> {
        (self.status == StatusKind::Failed).then_some(self.reason.as_str())
    }

    /// Computed value, present only when the status is `success`.
    #[must_use]
    pub fn result(&self) -> Option<f64> {
        (self.status == StatusKind::Success).then_some(self.result)
    }
}

fn default_api_version() -> String {
    API_VERSION.to_string()
}

fn default_kind() -> String {
    KIND.to_string()
}

/// A Calculator resource: identity, desired state and observed state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Calculator {
    #[serde(default = "default_api_version")]
    pub api_version: String,
    #[serde(default = "default_kind")]
    pub kind: String,
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub spec: CalculatorSpec,
    #[serde(default)]
    pub status: CalculatorStatus,
}

impl Calculator {
    /// Create a Calculator with an empty status.
    #[must_use]
    pub fn new(key: &ObjectKey, spec: CalculatorSpec) -> Self {
        Self {
            api_version: default_api_version(),
            kind: default_kind(),
            metadata: ObjectMeta {
                name: key.name.clone(),
                namespace: key.namespace.clone(),
                resource_version: 0,
                generation: 0,
            },
            spec,
            status: CalculatorStatus::default(),
        }
    }

    #[must_use]
    pub fn key(&self) -> ObjectKey {
        self.metadata.key()
    }

    /// Same resource with its observed state replaced wholesale.
    #[must_use]
    pub fn with_status(mut self, status: CalculatorStatus) -> Self {
        self.status = status;
        self
    }
}
