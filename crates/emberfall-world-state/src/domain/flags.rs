//! Story flag values.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A story flag: either a switch or a counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FlagValue {
    /// On/off.
    Bool(bool),
    /// Counter or score.
    Number(i64),
}

impl FlagValue {
    /// `true` for `Bool(true)` and any non-zero number.
    #[must_use]
    pub fn is_truthy(self) -> bool {
        match self {
            Self::Bool(b) => b,
            Self::Number(n) => n != 0,
        }
    }

    /// Numeric view; booleans count as 0 or 1.
    #[must_use]
    pub fn as_number(self) -> i64 {
        match self {
            Self::Bool(b) => i64::from(b),
            Self::Number(n) => n,
        }
    }
}

impl From<bool> for FlagValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for FlagValue {
    fn from(value: i64) -> Self {
        Self::Number(value)
    }
}

impl fmt::Display for FlagValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Number(n) => write!(f, "{n}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_untagged_wire_form() {
        let flags: Vec<FlagValue> = serde_json::from_str("[true, 3]").unwrap();

        assert_eq!(flags, vec![FlagValue::Bool(true), FlagValue::Number(3)]);
    }

    #[test]
    fn test_truthiness() {
        assert!(FlagValue::Bool(true).is_truthy());
        assert!(!FlagValue::Number(0).is_truthy());
        assert!(FlagValue::Number(-2).is_truthy());
        assert_eq!(FlagValue::Bool(true).as_number(), 1);
    }
}
