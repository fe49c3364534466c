//! Stage category and lifecycle state enums.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The host identifier used by host-agnostic stages.
pub const SYSTEM_HOST: &str = "system";

/// The purpose of a stage, used for discovery and filtering.
///
/// Categories do not change how a stage is executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageCategory {
    /// Gathers items into the context (e.g., files, scene nodes).
    Collect,
    /// Validates collected items.
    Check,
    /// Asks for or injects user-supplied values.
    Input,
    /// Writes artifacts and records their identifiers.
    Export,
    /// Diagnostics with no effect on the pipeline output.
    Debug,
}

impl StageCategory {
    /// All categories in pipeline order.
    pub const ALL: [Self; 5] = [
        Self::Collect,
        Self::Check,
        Self::Input,
        Self::Export,
        Self::Debug,
    ];
}

impl fmt::Display for StageCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Collect => write!(f, "collect"),
            Self::Check => write!(f, "check"),
            Self::Input => write!(f, "input"),
            Self::Export => write!(f, "export"),
            Self::Debug => write!(f, "debug"),
        }
    }
}

impl FromStr for StageCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "collect" => Ok(Self::Collect),
            "check" => Ok(Self::Check),
            "input" => Ok(Self::Input),
            "export" => Ok(Self::Export),
            "debug" => Ok(Self::Debug),
            other => Err(format!("unknown stage category '{other}'")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_display() {
        assert_eq!(StageCategory::Collect.to_string(), "collect");
        assert_eq!(StageCategory::Check.to_string(), "check");
        assert_eq!(StageCategory::Export.to_string(), "export");
    }

    #[test]
    fn test_category_from_str_ignores_case() {
        assert_eq!("COLLECT".parse::<StageCategory>(), Ok(StageCategory::Collect));
        assert_eq!("Debug".parse::<StageCategory>(), Ok(StageCategory::Debug));
        assert!("render".parse::<StageCategory>().is_err());
    }

    #[test]
    fn test_category_serialize() {
        let json = serde_json::to_string(&StageCategory::Input).unwrap();
        assert_eq!(json, r#""input""#);

        let deserialized: StageCategory = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, StageCategory::Input);
    }
}
