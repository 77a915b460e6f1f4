//! Computation dispatcher.
//!
//! Operands are assumed to have passed validation for the operation. The
//! dispatcher performs no domain checks of its own: dividing by zero yields
//! an IEEE infinity and an absent operand yields `Error::MissingOperand`.

use crate::error::{Error, Result};
use crate::operation::Operation;

impl Operation {
    /// Compute this operation over `values`.
    ///
    /// # Errors
    ///
    /// Returns `Error::MissingOperand` when `values` is shorter than the
    /// algorithm needs. Validated input never produces it.
    pub fn compute(self, values: &[f64]) -> Result<f64> {
        match self {
            Self::Add => Ok(values.iter().fold(0.0, |acc, value| acc + value)),
            Self::Sub => self.fold_from_first(values, |acc, value| acc - value),
            Self::Mul => Ok(values.iter().fold(1.0, |acc, value| acc * value)),
            Self::Div => self.fold_from_first(values, |acc, value| acc / value),
            Self::Fact => self.operand(values, 0).map(factorial),
            Self::Log => {
                let number = self.operand(values, 0)?;
                let base = self.operand(values, 1)?;
                Ok(number.log2() / base.log2())
            }
            Self::Exp => {
                let base = self.operand(values, 0)?;
                let power = self.operand(values, 1)?;
                Ok(base.powf(power))
            }
            Self::Sin => self.operand(values, 0).map(f64::sin),
            Self::Cos => self.operand(values, 0).map(f64::cos),
            Self::Sinh => self.operand(values, 0).map(f64::sinh),
            Self::Cosh => self.operand(values, 0).map(f64::cosh),
        }
    }

    fn operand(self, values: &[f64], index: usize) -> Result<f64> {
        values
            .get(index)
            .copied()
            .ok_or_else(|| Error::missing_operand(self.code(), index))
    }

    /// Left-associative fold seeded by the first operand.
    fn fold_from_first(self, values: &[f64], step: impl Fn(f64, f64) -> f64) -> Result<f64> {
        let (first, rest) = values
            .split_first()
            .ok_or_else(|| Error::missing_operand(self.code(), 0))?;
        Ok(rest.iter().fold(*first, |acc, value| step(acc, *value)))
    }
}

/// `n!` over a wrapping `u64` accumulator, `n` being the truncated operand.
///
/// Overflow wraps. Once the accumulator wraps to zero every further factor
/// keeps it at zero, so the loop stops there.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
fn factorial(operand: f64) -> f64 {
    let n = operand as u64;
    let mut product: u64 = 1;
    for factor in 1..=n {
        product = product.wrapping_mul(factor);
        if product == 0 {
            break;
        }
    }
    product as f64
}

/// Parse `operation` and compute it over `values`.
///
/// # Errors
///
/// Returns `Error::UnknownOperation` for a code outside the closed set, or
/// any error of [`Operation::compute`].
pub fn compute(operation: &str, values: &[f64]) -> Result<f64> {
    operation.parse::<Operation>()?.compute(values)
}
