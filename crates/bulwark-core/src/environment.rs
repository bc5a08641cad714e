use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

/// Deployment environment the error pipeline renders for
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum Environment {
    /// Full diagnostic detail in error bodies
    Development,
    /// Filtered detail in error bodies
    #[default]
    Production,
    /// Any other value; rendered like production
    Unrecognized,
}

/// How much of a failure reaches the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disclosure {
    /// Message, normalized failure record and trace
    Full,
    /// Status and message of operational failures only
    Filtered,
}

impl Environment {
    pub const fn disclosure(self) -> Disclosure {
        match self {
            Self::Development => Disclosure::Full,
            Self::Production | Self::Unrecognized => Disclosure::Filtered,
        }
    }

    pub const fn is_development(self) -> bool {
        matches!(self, Self::Development)
    }
}

impl From<&str> for Environment {
    fn from(value: &str) -> Self {
        match value.trim() {
            "development" => Self::Development,
            "production" => Self::Production,
            _ => Self::Unrecognized,
        }
    }
}

impl From<String> for Environment {
    fn from(value: String) -> Self {
        Self::from(value.as_str())
    }
}

impl FromStr for Environment {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from(s))
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Development => "development",
            Self::Production => "production",
            Self::Unrecognized => "unrecognized",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognized_values() {
        assert_eq!(Environment::from("development"), Environment::Development);
        assert_eq!(Environment::from("production"), Environment::Production);
    }

    #[test]
    fn unknown_values_filter() {
        for raw in ["", "staging", "test", "Development"] {
            let env = Environment::from(raw);
            assert_eq!(env, Environment::Unrecognized, "{raw}");
            assert_eq!(env.disclosure(), Disclosure::Filtered);
        }
    }

    #[test]
    fn only_development_discloses_everything() {
        assert_eq!(Environment::Development.disclosure(), Disclosure::Full);
        assert_eq!(Environment::Production.disclosure(), Disclosure::Filtered);
    }

    #[test]
    fn deserializes_from_string() {
        let env: Environment = serde_json::from_str("\"development\"").unwrap();
        assert!(env.is_development());

        let env: Environment = serde_json::from_str("\"qa\"").unwrap();
        assert_eq!(env, Environment::Unrecognized);
    }
}
