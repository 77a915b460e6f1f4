//! Convergence core for Calculator resources.
//!
//! This crate holds the pure part of the operator:
//!
//! - **Operation**: the closed set of arithmetic operations, parsed case-insensitively
//! - **Count rule**: operand cardinality (`at-least`, `at-most`, `exactly`)
//! - **Semantic rules**: per-operation domain restrictions
//! - **Validation**: count plus semantic rules, every violation accumulated
//! - **Computation**: one algorithm per operation
//!
//! Nothing here blocks or performs I/O, and nothing holds shared state, so
//! every function is safe to call concurrently for different resources.
//!
//! # Example
//!
//! ```
//! use calc_core::{compute, validate};
//!
//! let verdict = validate("log", &[8.0, 2.0]);
//! assert!(verdict.is_ok());
//! assert_eq!(compute("log", &[8.0, 2.0]), Ok(3.0));
//!
//! let verdict = validate("div", &[10.0, 0.0]);
//! assert_eq!(verdict.violations(), ["denominator at index 1 cannot be 0"]);
//! ```

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![forbid(clippy::panic)]

pub mod compute;
pub mod count;
pub mod error;
pub mod operation;
pub mod rules;
pub mod validate;

pub use compute::compute;
pub use count::{CountMode, CountRule, check_count};
pub use error::{Error, Result};
pub use operation::Operation;
pub use rules::SemanticRule;
pub use validate::{REASON_SEPARATOR, Verdict, validate, validate_kind};
