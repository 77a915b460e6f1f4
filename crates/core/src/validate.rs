//! Validation orchestrator: count rule plus semantic rule per operation.
//!
//! Validation never applies defaults. It judges exactly the operation and
//! operands it is given.

use tracing::debug;

use crate::count::CountRule;
use crate::error::{Error, Result};
use crate::operation::Operation;
use crate::rules::SemanticRule;

/// Separator used when violations are folded into a single reason.
pub const REASON_SEPARATOR: &str = "; ";

/// Accumulated outcome of a validation call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Verdict {
    violations: Vec<String>,
}

impl Verdict {
    /// A verdict with no violations.
    #[must_use]
    pub const fn pass() -> Self {
        Self {
            violations: Vec::new(),
        }
    }

    /// A verdict carrying the given violations, in order.
    #[must_use]
    pub const fn from_violations(violations: Vec<String>) -> Self {
        Self { violations }
    }

    /// True when there are no violations.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.violations.is_empty()
    }

    #[must_use]
    pub fn violations(&self) -> &[String] {
        &self.violations
    }

    /// All violations joined into one human-readable reason.
    #[must_use]
    pub fn reason(&self) -> String {
        self.violations.join(REASON_SEPARATOR)
    }

    /// Append the violations of `other` after this verdict's own.
    #[must_use]
    pub fn and(mut self, other: Self) -> Self {
        self.violations.extend(other.violations);
        self
    }

    /// Turn the verdict into a `Result`.
    ///
    /// # Errors
    ///
    /// Returns `Error::ValidationFailed` carrying every violation when the
    /// verdict is not ok.
    pub fn into_result(self) -> Result<()> {
        if self.is_ok() {
            Ok(())
        } else {
            Err(Error::validation_failed(self.violations))
        }
    }
}

/// Minimum number of operands for any operation, checked before anything else.
const GLOBAL_MINIMUM: CountRule = CountRule::at_least(1);

/// Validate operands against a textual operation code.
///
/// The global minimum is checked first and short-circuits. An operation code
/// outside the closed set yields a single `unknown operation` violation.
#[must_use]
pub fn validate(operation: &str, values: &[f64]) -> Verdict {
    let minimum = GLOBAL_MINIMUM.check(values);
    if !minimum.is_ok() {
        return minimum;
    }

    match operation.parse::<Operation>() {
        Ok(op) => validate_operation(op, values),
        Err(_) => Verdict::from_violations(vec![format!("unknown operation {operation}")]),
    }
}

/// Validate operands for an already-parsed operation.
#[must_use]
pub fn validate_kind(op: Operation, values: &[f64]) -> Verdict {
    let minimum = GLOBAL_MINIMUM.check(values);
    if !minimum.is_ok() {
        return minimum;
    }
    validate_operation(op, values)
}

fn validate_operation(op: Operation, values: &[f64]) -> Verdict {
    let count = op.requirement().check(values);
    let verdict = if count.is_ok() {
        count.and(Verdict::from_violations(
            SemanticRule::for_operation(op).violations(values),
        ))
    } else {
        count
    };

    debug!(
        operation = %op,
        operands = values.len(),
        violations = verdict.violations().len(),
        "Validated operands"
    );
    verdict
}
