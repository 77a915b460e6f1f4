//! Per-operation domain rules applied after the count requirement holds.
//!
//! Every check inside a rule runs independently so a single call reports all
//! of its violations at once.

use itertools::Itertools;

use crate::operation::Operation;

/// Domain rule attached to an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SemanticRule {
    /// Nothing beyond the operand count.
    Unrestricted,
    /// Every operand after the first is a divisor and must be non-zero.
    NonZeroDivisors,
    /// Single operand must be a non-negative whole number.
    WholeNonNegative,
    /// `[number, base]` with `number > 0` and `base > 1`.
    LogarithmDomain,
    /// `[base, power]` excluding `0 ^ p<=0` and even roots of negatives.
    PowerDomain,
}

impl SemanticRule {
    /// Rule used for `op`.
    #[must_use]
    pub const fn for_operation(op: Operation) -> Self {
        match op {
            Operation::Add
            | Operation::Sub
            | Operation::Mul
            | Operation::Sin
            | Operation::Cos
            | Operation::Sinh
            | Operation::Cosh => Self::Unrestricted,
            Operation::Div => Self::NonZeroDivisors,
            Operation::Fact => Self::WholeNonNegative,
            Operation::Log => Self::LogarithmDomain,
            Operation::Exp => Self::PowerDomain,
        }
    }

    /// Violations of this rule, in operand order.
    #[must_use]
    pub fn violations(self, values: &[f64]) -> Vec<String> {
        match self {
            Self::Unrestricted => Vec::new(),
            Self::NonZeroDivisors => zero_divisors(values),
            Self::WholeNonNegative => factorial_domain(values),
            Self::LogarithmDomain => logarithm_domain(values),
            Self::PowerDomain => power_domain(values),
        }
    }
}

fn zero_divisors(values: &[f64]) -> Vec<String> {
    values
        .iter()
        .enumerate()
        .skip(1)
        .filter(|(_, divisor)| **divisor == 0.0)
        .map(|(index, _)| format!("denominator at index {index} cannot be 0"))
        .collect_vec()
}

fn factorial_domain(values: &[f64]) -> Vec<String> {
    let &[operand] = values else {
        return Vec::new();
    };

    let mut violations = Vec::new();
    if operand < 0.0 {
        violations.push(format!(
            "factorial can't be computed for negative number {operand}"
        ));
    }
    if operand != operand.trunc() {
        violations.push(format!(
            "factorial can't be computed for non-whole number {operand}"
        ));
    }
    violations
}

fn logarithm_domain(values: &[f64]) -> Vec<String> {
    let &[number, base] = values else {
        return Vec::new();
    };

    let mut violations = Vec::new();
    if number <= 0.0 {
        violations.push(format!("number {number} must be positive"));
    }
    if base <= 1.0 {
        violations.push(format!("base {base} must be > 1"));
    }
    violations
}

fn power_domain(values: &[f64]) -> Vec<String> {
    let &[base, power] = values else {
        return Vec::new();
    };

    let mut violations = Vec::new();
    if base == 0.0 && power <= 0.0 {
        violations.push("0 ^ x where x <= 0 is not valid".to_string());
    }
    // even root of a negative number
    if base < 0.0 && power > 0.0 && power < 1.0 {
        violations.push("x ^ y where x < 0 and 0 < y < 1 is not valid".to_string());
    }
    violations
}
