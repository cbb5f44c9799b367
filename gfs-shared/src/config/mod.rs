//! # Configuration
//!
//! Client configuration and the policy knobs shared with the session layer.

#[cfg(not(target_arch = "wasm32"))]
pub mod client;

use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// How a session treats a stored user record that cannot be parsed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadPolicy {
    /// Fail session loading.
    #[default]
    Strict,
    /// Treat the stored session as absent: delete the token and the user
    /// and start signed out.
    Lenient,
}

impl LoadPolicy {
    /// Canonical lowercase name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Strict => "strict",
            Self::Lenient => "lenient",
        }
    }
}

impl fmt::Display for LoadPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LoadPolicy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "strict" => Ok(Self::Strict),
            "lenient" => Ok(Self::Lenient),
            other => Err(format!("unknown load policy '{other}', expected strict or lenient")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_policy_parse() {
        assert_eq!("strict".parse::<LoadPolicy>(), Ok(LoadPolicy::Strict));
        assert_eq!(" Lenient ".parse::<LoadPolicy>(), Ok(LoadPolicy::Lenient));
        assert!("sloppy".parse::<LoadPolicy>().is_err());
    }

    #[test]
    fn test_load_policy_serde_names() {
        assert_eq!(serde_json::to_string(&LoadPolicy::Lenient).unwrap(), "\"lenient\"");
        assert_eq!(LoadPolicy::default(), LoadPolicy::Strict);
    }
}
