use std::time::Duration;

use serde::{Deserialize, Deserializer};

/// CORS configuration
///
/// Enabled and fully permissive unless configured otherwise, since browser
/// clients talk to the proxy as if it were the backend itself.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CorsConfig {
    /// Apply the CORS layer at all
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Allowed origins ("*" or explicit list)
    #[serde(default)]
    pub origins: AnyOrList,
    /// Allowed HTTP methods ("*" or explicit list)
    #[serde(default)]
    pub methods: AnyOrList,
    /// Allowed request headers ("*" or explicit list)
    #[serde(default)]
    pub headers: AnyOrList,
    /// Headers exposed to the browser
    #[serde(default)]
    pub expose_headers: Vec<String>,
    /// Allow credentials; requires an explicit origin list
    #[serde(default)]
    pub credentials: bool,
    /// Preflight cache lifetime in seconds
    #[serde(default)]
    pub max_age: Option<u64>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            origins: AnyOrList::Any,
            methods: AnyOrList::Any,
            headers: AnyOrList::Any,
            expose_headers: Vec::new(),
            credentials: false,
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

/// Either the wildcard "*" or an explicit list of values
///
/// Accepts a single string or an array; a "*" anywhere means any.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum AnyOrList {
    /// Match any value
    #[default]
    Any,
    /// Explicit list
    List(Vec<String>),
}

impl<'de> Deserialize<'de> for AnyOrList {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            One(String),
            Many(Vec<String>),
        }

        let values = match Raw::deserialize(deserializer)? {
            Raw::One(value) => vec![value],
            Raw::Many(values) => values,
        };

        if values.iter().any(|v| v == "*") {
            Ok(Self::Any)
        } else {
            Ok(Self::List(values))
        }
    }
}

#[allow(clippy::missing_const_for_fn)]
fn default_enabled() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_table_is_permissive() {
        let config: CorsConfig = toml::from_str("").unwrap();
        assert!(config.enabled);
        assert_eq!(config.origins, AnyOrList::Any);
        assert_eq!(config.methods, AnyOrList::Any);
        assert!(!config.credentials);
    }

    #[test]
    fn wildcard_string_means_any() {
        let config: CorsConfig = toml::from_str(r#"origins = "*""#).unwrap();
        assert_eq!(config.origins, AnyOrList::Any);
    }

    #[test]
    fn explicit_origin_list() {
        let toml = r#"
            origins = ["https://chat.example.com", "https://admin.example.com"]
            methods = "POST"
            max_age = 600
        "#;

        let config: CorsConfig = toml::from_str(toml).unwrap();
        assert_eq!(
            config.origins,
            AnyOrList::List(vec![
                "https://chat.example.com".to_owned(),
                "https://admin.example.com".to_owned()
            ])
        );
        assert_eq!(config.methods, AnyOrList::List(vec!["POST".to_owned()]));
        assert_eq!(config.max_age_duration(), Some(Duration::from_secs(600)));
    }

    #[test]
    fn wildcard_inside_list_means_any() {
        let config: CorsConfig = toml::from_str(r#"headers = ["content-type", "*"]"#).unwrap();
        assert_eq!(config.headers, AnyOrList::Any);
    }
}
