use std::time::Duration;

use serde::Deserialize;

/// CORS configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CorsConfig {
    /// Allowed origins (wildcard "*" or explicit list)
    #[serde(default = "default_origins")]
    pub origins: AnyOrArray,
    /// Allowed HTTP methods (wildcard "*" or explicit list)
    #[serde(default)]
    pub methods: AnyOrArray,
    /// Allowed headers (wildcard "*" or explicit list)
    #[serde(default)]
    pub headers: AnyOrArray,
    /// Headers to expose to the browser
    #[serde(default)]
    pub expose_headers: Vec<String>,
    /// Allow credentials (cookies, authorization headers)
    #[serde(default = "default_credentials")]
    pub credentials: bool,
    /// Max age for preflight cache in seconds
    #[serde(default)]
    pub max_age: Option<u64>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            origins: default_origins(),
            methods: AnyOrArray::Any,
            headers: AnyOrArray::Any,
            expose_headers: Vec::new(),
            credentials: true,
            max_age: None,
        }
    }
}

impl CorsConfig {
    /// Get max age as Duration
    pub fn max_age_duration(&self) -> Option<Duration> {
        self.max_age.map(Duration::from_secs)
    }
}

/// Either a wildcard "*" or explicit list of values
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "RawAnyOrArray")]
pub enum AnyOrArray {
    /// Match any value
    #[default]
    Any,
    /// Explicit list
    List(Vec<String>),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawAnyOrArray {
    One(String),
    Many(Vec<String>),
}

impl From<RawAnyOrArray> for AnyOrArray {
    fn from(raw: RawAnyOrArray) -> Self {
        let values = match raw {
            RawAnyOrArray::One(value) => vec![value],
            RawAnyOrArray::Many(values) => values,
        };

        if values.iter().any(|value| value == "*") {
            return Self::Any;
        }

        // Unset `{{ env.X | default("") }}` entries expand to empty strings
        Self::List(values.into_iter().filter(|value| !value.trim().is_empty()).collect())
    }
}

fn default_origins() -> AnyOrArray {
    AnyOrArray::List(vec![
        "http://localhost:5173".to_owned(),
        "http://127.0.0.1:5173".to_owned(),
    ])
}

const fn default_credentials() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Deserialize)]
    struct Wrapper {
        cors: CorsConfig,
    }

    fn parse(raw: &str) -> CorsConfig {
        toml::from_str::<Wrapper>(raw).unwrap().cors
    }

    #[test]
    fn defaults_allow_local_frontend_with_credentials() {
        let cors = parse("[cors]");
        assert_eq!(
            cors.origins,
            AnyOrArray::List(vec!["http://localhost:5173".to_owned(), "http://127.0.0.1:5173".to_owned()])
        );
        assert!(cors.credentials);
        assert_eq!(cors.methods, AnyOrArray::Any);
    }

    #[test]
    fn wildcard_in_list_means_any() {
        let cors = parse("[cors]\norigins = [\"https://a.example\", \"*\"]");
        assert_eq!(cors.origins, AnyOrArray::Any);
    }

    #[test]
    fn single_string_becomes_list() {
        let cors = parse("[cors]\nmethods = \"GET\"");
        assert_eq!(cors.methods, AnyOrArray::List(vec!["GET".to_owned()]));
    }

    #[test]
    fn empty_origins_are_dropped() {
        let cors = parse("[cors]\norigins = [\"https://app.example\", \"\"]");
        assert_eq!(cors.origins, AnyOrArray::List(vec!["https://app.example".to_owned()]));
    }
}
