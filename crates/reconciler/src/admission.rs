//! Admission: defaulting and validation before a Calculator is stored.
//!
//! Defaulting happens here and only here. The convergence controller and the
//! core validation see whatever admission let through, unchanged.

use calc_core::Operation;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::types::{Calculator, CalculatorSpec};

/// Field path reported when the operation is rejected.
pub const OPERATION_FIELD: &str = "spec.operation";
/// Field path reported when the operands are rejected.
pub const OPERANDS_FIELD: &str = "spec.operands";

/// Values written into empty spec fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DefaultingPolicy {
    pub operation: Operation,
    pub operands: Vec<f64>,
}

impl DefaultingPolicy {
    /// `add` over `[0, 1]`.
    #[must_use]
    pub fn additive() -> Self {
        Self {
            operation: Operation::Add,
            operands: vec![0.0, 1.0],
        }
    }

    /// `mul` over `[1, 1]`.
    #[must_use]
    pub fn multiplicative() -> Self {
        Self {
            operation: Operation::Mul,
            operands: vec![1.0, 1.0],
        }
    }

    /// Look up a named policy: `add` or `mul`.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidConfig` for any other name.
    pub fn named(name: &str) -> Result<Self> {
        match name.trim().to_lowercase().as_str() {
            "add" | "additive" => Ok(Self::additive()),
            "mul" | "multiplicative" => Ok(Self::multiplicative()),
            other => Err(Error::invalid_config(format!(
                "unknown defaulting policy '{other}'"
            ))),
        }
    }
}

impl Default for DefaultingPolicy {
    fn default() -> Self {
        Self::additive()
    }
}

/// Admission step applied to incoming desired state.
#[derive(Debug, Clone, Default)]
pub struct Admission {
    policy: DefaultingPolicy,
}

impl Admission {
    #[must_use]
    pub const fn new(policy: DefaultingPolicy) -> Self {
        Self { policy }
    }

    #[must_use]
    pub const fn policy(&self) -> &DefaultingPolicy {
        &self.policy
    }

    /// Fill an empty operation and an empty operand list.
    pub fn default_spec(&self, spec: &mut CalculatorSpec) {
        if spec.operation.trim().is_empty() {
            debug!(operation = %self.policy.operation, "Defaulting operation");
            spec.operation = self.policy.operation.code().to_string();
        }
        if spec.operands.is_empty() {
            debug!(operands = ?self.policy.operands, "Defaulting operands");
            spec.operands.clone_from(&self.policy.operands);
        }
    }

    /// Validate a spec as-is.
    ///
    /// # Errors
    ///
    /// Returns `Error::AdmissionDenied` naming the offending field.
    pub fn validate_spec(&self, spec: &CalculatorSpec) -> Result<()> {
        if spec.operation.parse::<Operation>().is_err() {
            return Err(Error::admission_denied(
                OPERATION_FIELD,
                format!("unsupported operation '{}'", spec.operation),
            ));
        }

        calc_core::validate(&spec.operation, &spec.operands)
            .into_result()
            .map_err(|err| Error::admission_denied(OPERANDS_FIELD, err.to_string()))
    }

    /// Default then validate.
    ///
    /// # Errors
    ///
    /// Returns `Error::AdmissionDenied` when the defaulted spec is invalid.
    pub fn admit(&self, mut spec: CalculatorSpec) -> Result<CalculatorSpec> {
        self.default_spec(&mut spec);
        self.validate_spec(&spec)?;
        Ok(spec)
    }

    /// Admit a whole Calculator, keeping its metadata.
    ///
    /// # Errors
    ///
    /// Returns `Error::AdmissionDenied` when the defaulted spec is invalid.
    pub fn admit_calculator(&self, mut calculator: Calculator) -> Result<Calculator> {
        let key = calculator.key();
        calculator.spec = self.admit(calculator.spec)?;
        info!(key = %key, operation = %calculator.spec.operation, "Admitted calculator");
        Ok(calculator)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy_is_additive() {
        assert_eq!(DefaultingPolicy::default(), DefaultingPolicy::additive());
        assert_eq!(DefaultingPolicy::named("MUL").unwrap(), DefaultingPolicy::multiplicative());
        assert!(DefaultingPolicy::named("sub").is_err());
    }

    #[test]
    fn test_defaults_fill_only_empty_fields() {
        let admission = Admission::default();

        let mut empty = CalculatorSpec::default();
        admission.default_spec(&mut empty);
        assert_eq!(empty, CalculatorSpec::new("add", vec![0.0, 1.0]));

        let mut partial = CalculatorSpec::new("", vec![2.0, 3.0]);
        admission.default_spec(&mut partial);
        assert_eq!(partial, CalculatorSpec::new("add", vec![2.0, 3.0]));

        let mut full = CalculatorSpec::new("div", vec![9.0, 3.0]);
        admission.default_spec(&mut full);
        assert_eq!(full, CalculatorSpec::new("div", vec![9.0, 3.0]));
    }

    #[test]
    fn test_multiplicative_defaults() {
        let admission = Admission::new(DefaultingPolicy::multiplicative());
        let spec = admission.admit(CalculatorSpec::default()).unwrap();
        assert_eq!(spec, CalculatorSpec::new("mul", vec![1.0, 1.0]));
    }

    #[test]
    fn test_admit_rejects_invalid_operands() {
        let admission = Admission::default();
        let err = admission
            .admit(CalculatorSpec::new("div", vec![10.0, 0.0]))
            .unwrap_err();
        assert!(matches!(
            err,
            Error::AdmissionDenied { ref field, ref reason }
                if field == OPERANDS_FIELD && reason.contains("denominator at index 1 cannot be 0")
        ));
    }

    #[test]
    fn test_admit_rejects_unknown_operation() {
        let admission = Admission::default();
        let err = admission
            .admit(CalculatorSpec::new("pow", vec![2.0, 3.0]))
            .unwrap_err();
        assert!(matches!(
            err,
            Error::AdmissionDenied { ref field, .. } if field == OPERATION_FIELD
        ));
    }

    #[test]
    fn test_validation_alone_never_defaults() {
        let admission = Admission::default();
        assert!(admission.validate_spec(&CalculatorSpec::default()).is_err());
    }

    #[test]
    fn test_policy_deserializes_from_config() {
        let policy: DefaultingPolicy =
            serde_json::from_str(r#"{"operation": "MUL", "operands": [1, 1]}"#).unwrap();
        assert_eq!(policy, DefaultingPolicy::multiplicative());
    }
}
