//! The closed set of arithmetic operations a Calculator can request.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::count::CountRule;
use crate::error::Error;

/// Operation requested by a Calculator.
///
/// Parsing is case-insensitive; anything outside the closed set fails rather
/// than falling back to a default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Operation {
    Add,
    Sub,
    Mul,
    Div,
    Fact,
    Log,
    Exp,
    Sin,
    Cos,
    Sinh,
    Cosh,
}

impl Operation {
    /// Every operation, in declaration order.
    pub const ALL: [Self; 11] = [
        Self::Add,
        Self::Sub,
        Self::Mul,
        Self::Div,
        Self::Fact,
        Self::Log,
        Self::Exp,
        Self::Sin,
        Self::Cos,
        Self::Sinh,
        Self::Cosh,
    ];

    /// Wire code of the operation.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Sub => "sub",
            Self::Mul => "mul",
            Self::Div => "div",
            Self::Fact => "fact",
            Self::Log => "log",
            Self::Exp => "exp",
            Self::Sin => "sin",
            Self::Cos => "cos",
            Self::Sinh => "sinh",
            Self::Cosh => "cosh",
        }
    }

    /// Operand cardinality this operation requires.
    #[must_use]
    pub const fn requirement(self) -> CountRule {
        match self {
            Self::Add | Self::Sub | Self::Mul | Self::Div => CountRule::at_least(2),
            Self::Log | Self::Exp => CountRule::exactly(2),
            Self::Fact | Self::Sin | Self::Cos | Self::Sinh | Self::Cosh => CountRule::exactly(1),
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Operation {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.to_lowercase();
        Self::ALL
            .into_iter()
            .find(|op| op.code() == wanted)
            .ok_or_else(|| Error::unknown_operation(s))
    }
}

impl TryFrom<String> for Operation {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Operation> for String {
    fn from(op: Operation) -> Self {
        op.code().to_string()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::count::CountMode;

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!("ADD".parse::<Operation>(), Ok(Operation::Add));
        assert_eq!("Sinh".parse::<Operation>(), Ok(Operation::Sinh));
        assert_eq!("fact".parse::<Operation>(), Ok(Operation::Fact));
    }

    #[test]
    fn test_parse_rejects_unknown_codes() {
        let err = "modulo".parse::<Operation>().unwrap_err();
        assert_eq!(err, Error::unknown_operation("modulo"));
        assert!("".parse::<Operation>().is_err());
        assert!("addition".parse::<Operation>().is_err());
        assert!(" add ".parse::<Operation>().is_err());
    }

    #[test]
    fn test_code_round_trips_through_parse() {
        for op in Operation::ALL {
            assert_eq!(op.code().parse::<Operation>(), Ok(op));
            assert_eq!(op.to_string(), op.code());
        }
    }

    #[test]
    fn test_requirements_follow_arity() {
        assert_eq!(Operation::Div.requirement().mode(), CountMode::AtLeast);
        assert_eq!(Operation::Log.requirement().count(), 2);
        assert_eq!(Operation::Cosh.requirement().mode(), CountMode::Exactly);
        assert_eq!(Operation::Cosh.requirement().count(), 1);
    }

    #[test]
    fn test_serde_uses_wire_code() {
        let json = serde_json::to_string(&Operation::Exp).unwrap();
        assert_eq!(json, "\"exp\"");
        let parsed: Operation = serde_json::from_str("\"LOG\"").unwrap();
        assert_eq!(parsed, Operation::Log);
        assert!(serde_json::from_str::<Operation>("\"pow\"").is_err());
    }
}
