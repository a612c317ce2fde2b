use crate::utils::validation::{validate_range, validate_url};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::net::IpAddr;
use std::sync::LazyLock;
use thiserror::Error;

static EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email pattern is valid"));

static HOST_LABEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?$").expect("label pattern is valid")
});

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EnvVarError {
    #[error("{name} is missing and has no default")]
    Missing { name: String, desc: Option<String> },

    #[error("{name} has invalid value '{value}': {reason}")]
    Invalid {
        name: String,
        value: String,
        reason: String,
    },
}

impl EnvVarError {
    pub fn name(&self) -> &str {
        match self {
            EnvVarError::Missing { name, .. } | EnvVarError::Invalid { name, .. } => name,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VarKind {
    Str,
    Bool,
    Num,
    Port,
    Url,
    Email,
    Host,
    Json,
}

/// Declares how one environment variable is read: its type, an optional
/// default and an optional set of allowed raw values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Validator {
    #[serde(rename = "type")]
    pub kind: VarKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub choices: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub desc: Option<String>,
}

impl Validator {
    pub fn of(kind: VarKind) -> Self {
        Self {
            kind,
            default: None,
            choices: None,
            desc: None,
        }
    }

    pub fn str() -> Self {
        Self::of(VarKind::Str)
    }

    pub fn bool() -> Self {
        Self::of(VarKind::Bool)
    }

    pub fn num() -> Self {
        Self::of(VarKind::Num)
    }

    pub fn port() -> Self {
        Self::of(VarKind::Port)
    }

    pub fn url() -> Self {
        Self::of(VarKind::Url)
    }

    pub fn email() -> Self {
        Self::of(VarKind::Email)
    }

    pub fn host() -> Self {
        Self::of(VarKind::Host)
    }

    pub fn json() -> Self {
        Self::of(VarKind::Json)
    }

    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self
    }

    pub fn with_choices<I, S>(mut self, choices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.choices = Some(choices.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_desc(mut self, desc: impl Into<String>) -> Self {
        self.desc = Some(desc.into());
        self
    }

    /// Resolves the variable from its raw value, falling back to the default.
    pub fn resolve(&self, name: &str, raw: Option<&str>) -> Result<Value, EnvVarError> {
        match (raw, &self.default) {
            (Some(raw), _) => self.parse(name, raw),
            // String defaults go through the parser like any raw value.
            (None, Some(Value::String(default))) => self.parse(name, default),
            (None, Some(default)) => Ok(default.clone()),
            (None, None) => Err(EnvVarError::Missing {
                name: name.to_string(),
                desc: self.desc.clone(),
            }),
        }
    }

    pub fn parse(&self, name: &str, raw: &str) -> Result<Value, EnvVarError> {
        let invalid = |reason: String| EnvVarError::Invalid {
            name: name.to_string(),
            value: raw.to_string(),
            reason,
        };

        if let Some(choices) = &self.choices {
            if !choices.iter().any(|c| c == raw) {
                return Err(invalid(format!("must be one of: {}", choices.join(", "))));
            }
        }

        match self.kind {
            VarKind::Str => Ok(Value::String(raw.to_string())),
            VarKind::Bool => parse_bool(raw)
                .map(Value::Bool)
                .ok_or_else(|| invalid("expected a boolean".to_string())),
            VarKind::Num => parse_number(raw).ok_or_else(|| invalid("expected a number".to_string())),
            VarKind::Port => {
                let port: i64 = raw
                    .trim()
                    .parse()
                    .map_err(|_| invalid("expected an integer port".to_string()))?;
                validate_range(name, port, 1, 65535).map_err(|e| invalid(e.to_string()))?;
                Ok(Value::from(port))
            }
            VarKind::Url => {
                validate_url(name, raw).map_err(|e| invalid(e.to_string()))?;
                Ok(Value::String(raw.to_string()))
            }
            VarKind::Email => {
                if EMAIL.is_match(raw) {
                    Ok(Value::String(raw.to_string()))
                } else {
                    Err(invalid("expected an email address".to_string()))
                }
            }
            VarKind::Host => {
                if is_host(raw) {
                    Ok(Value::String(raw.to_string()))
                } else {
                    Err(invalid("expected a hostname or IP address".to_string()))
                }
            }
            VarKind::Json => {
                serde_json::from_str(raw).map_err(|e| invalid(format!("expected JSON: {}", e)))
            }
        }
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "t" | "1" | "yes" => Some(true),
        "false" | "f" | "0" | "no" => Some(false),
        _ => None,
    }
}

fn parse_number(raw: &str) -> Option<Value> {
    let trimmed = raw.trim();
    if let Ok(int) = trimmed.parse::<i64>() {
        return Some(Value::from(int));
    }
    let float = trimmed.parse::<f64>().ok().filter(|f| f.is_finite())?;
    serde_json::Number::from_f64(float).map(Value::Number)
}

fn is_host(raw: &str) -> bool {
    if raw.parse::<IpAddr>().is_ok() {
        return true;
    }
    !raw.is_empty() && raw.len() <= 253 && raw.split('.').all(|label| HOST_LABEL.is_match(label))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_resolve_prefers_raw_value_over_default() {
        let validator = Validator::str().with_default("development");
        assert_eq!(validator.resolve("NODE_ENV", Some("test")).unwrap(), json!("test"));
        assert_eq!(validator.resolve("NODE_ENV", None).unwrap(), json!("development"));
    }

    #[test]
    fn test_missing_without_default() {
        let err = Validator::str().resolve("API_KEY", None).unwrap_err();
        assert_eq!(err.name(), "API_KEY");
        assert!(matches!(err, EnvVarError::Missing { .. }));
    }

    #[test]
    fn test_typed_parsing() {
        assert_eq!(Validator::num().parse("N", "42").unwrap(), json!(42));
        assert_eq!(Validator::num().parse("N", "2.5").unwrap(), json!(2.5));
        assert!(Validator::num().parse("N", "test").is_err());
        assert_eq!(Validator::bool().parse("B", "YES").unwrap(), json!(true));
        assert_eq!(Validator::bool().parse("B", "0").unwrap(), json!(false));
        assert!(Validator::bool().parse("B", "maybe").is_err());
        assert_eq!(Validator::port().parse("P", "8080").unwrap(), json!(8080));
        assert!(Validator::port().parse("P", "0").is_err());
        assert!(Validator::port().parse("P", "99999").is_err());
        assert!(Validator::url().parse("U", "https://example.com/x").is_ok());
        assert!(Validator::url().parse("U", "example").is_err());
        assert!(Validator::email().parse("E", "ops@example.com").is_ok());
        assert!(Validator::email().parse("E", "ops.example.com").is_err());
        assert!(Validator::host().parse("H", "db.internal").is_ok());
        assert!(Validator::host().parse("H", "10.0.0.1").is_ok());
        assert!(Validator::host().parse("H", "bad_host!").is_err());
        assert_eq!(
            Validator::json().parse("J", r#"{"a": [1, 2]}"#).unwrap(),
            json!({"a": [1, 2]})
        );
    }

    #[test]
    fn test_choices_are_checked_on_raw_value() {
        let validator = Validator::str().with_choices(["development", "test", "production"]);
        assert!(validator.parse("NODE_ENV", "test").is_ok());
        assert!(validator.parse("NODE_ENV", "staging").is_err());
    }

    #[test]
    fn test_non_string_default_is_used_as_is() {
        let validator = Validator::port().with_default(3000);
        assert_eq!(validator.resolve("PORT", None).unwrap(), json!(3000));
    }
}
