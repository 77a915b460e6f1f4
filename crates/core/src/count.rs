//! Operand cardinality rule.

use std::fmt;
use std::str::FromStr;

use crate::error::Error;
use crate::validate::Verdict;

/// How an operand count is compared against the required number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CountMode {
    AtLeast,
    AtMost,
    Exactly,
}

impl CountMode {
    const fn label(self) -> &'static str {
        match self {
            Self::AtLeast => "at-least",
            Self::AtMost => "at-most",
            Self::Exactly => "exactly",
        }
    }
}

impl fmt::Display for CountMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for CountMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "min" | "at-least" => Ok(Self::AtLeast),
            "max" | "at-most" => Ok(Self::AtMost),
            "exact" | "exactly" => Ok(Self::Exactly),
            _ => Err(Error::unknown_count_mode(s)),
        }
    }
}

/// Cardinality requirement on an operand sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CountRule {
    mode: CountMode,
    count: usize,
}

impl CountRule {
    /// Create a rule from a mode and a required count.
    #[must_use]
    pub const fn new(mode: CountMode, count: usize) -> Self {
        Self { mode, count }
    }

    #[must_use]
    pub const fn at_least(count: usize) -> Self {
        Self::new(CountMode::AtLeast, count)
    }

    #[must_use]
    pub const fn at_most(count: usize) -> Self {
        Self::new(CountMode::AtMost, count)
    }

    #[must_use]
    pub const fn exactly(count: usize) -> Self {
        Self::new(CountMode::Exactly, count)
    }

    #[must_use]
    pub const fn mode(&self) -> CountMode {
        self.mode
    }

    #[must_use]
    pub const fn count(&self) -> usize {
        self.count
    }

    /// Check the length of `values` against this rule.
    #[must_use]
    pub fn check(&self, values: &[f64]) -> Verdict {
        let found = values.len();
        let ok = match self.mode {
            CountMode::AtLeast => found >= self.count,
            CountMode::AtMost => found <= self.count,
            CountMode::Exactly => found == self.count,
        };

        if ok {
            Verdict::pass()
        } else {
            Verdict::from_violations(vec![format!(
                "expected {} {} values but found {found} values",
                self.mode, self.count
            )])
        }
    }
}

/// Parse a textual mode and check `values` against it.
///
/// # Errors
///
/// Returns `Error::UnknownCountMode` when `mode` is not a recognised mode.
pub fn check_count(values: &[f64], mode: &str, count: usize) -> crate::Result<Verdict> {
    let mode = mode.parse::<CountMode>()?;
    Ok(CountRule::new(mode, count).check(values))
}
