use crate::utils::error::{Result, ScaffoldError};
use regex::Regex;
use std::sync::LazyLock;
use url::Url;

static IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("identifier pattern is valid"));

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

pub fn validate_url(field_name: &str, url_str: &str) -> Result<()> {
    if url_str.is_empty() {
        return Err(ScaffoldError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: url_str.to_string(),
            reason: "URL cannot be empty".to_string(),
        });
    }

    match Url::parse(url_str) {
        Ok(url) if url.has_host() => Ok(()),
        Ok(_) => Err(ScaffoldError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: url_str.to_string(),
            reason: "URL has no host".to_string(),
        }),
        Err(e) => Err(ScaffoldError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: url_str.to_string(),
            reason: format!("Invalid URL format: {}", e),
        }),
    }
}

pub fn validate_path(field_name: &str, path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(ScaffoldError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path cannot be empty".to_string(),
        });
    }

    if path.contains('\0') {
        return Err(ScaffoldError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path contains null bytes".to_string(),
        });
    }

    Ok(())
}

/// Resource and model names double as registry keys and mapper names.
pub fn validate_identifier(field_name: &str, value: &str) -> Result<()> {
    if !IDENTIFIER.is_match(value) {
        return Err(ScaffoldError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: "Must start with a letter or underscore and contain only letters, digits and underscores"
                .to_string(),
        });
    }
    Ok(())
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(ScaffoldError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: "Value cannot be empty or whitespace-only".to_string(),
        });
    }
    Ok(())
}

pub fn validate_range<T: PartialOrd + std::fmt::Display + Copy>(
    field_name: &str,
    value: T,
    min: T,
    max: T,
) -> Result<()> {
    if value < min || value > max {
        return Err(ScaffoldError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be between {} and {}", min, max),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_url() {
        assert!(validate_url("DATABASE_URL", "https://example.com").is_ok());
        assert!(validate_url("DATABASE_URL", "postgres://db.local:5432/app").is_ok());
        assert!(validate_url("DATABASE_URL", "").is_err());
        assert!(validate_url("DATABASE_URL", "invalid-url").is_err());
        assert!(validate_url("DATABASE_URL", "mailto:someone@example.com").is_err());
    }

    #[test]
    fn test_validate_identifier() {
        assert!(validate_identifier("resource", "users").is_ok());
        assert!(validate_identifier("resource", "_audit_log2").is_ok());
        assert!(validate_identifier("resource", "").is_err());
        assert!(validate_identifier("resource", "2users").is_err());
        assert!(validate_identifier("resource", "user-accounts").is_err());
    }

    #[test]
    fn test_validate_range() {
        assert!(validate_range("PORT", 8080, 1, 65535).is_ok());
        assert!(validate_range("PORT", 0, 1, 65535).is_err());
        assert!(validate_range("PORT", 70000, 1, 65535).is_err());
    }

    #[test]
    fn test_validate_path() {
        assert!(validate_path("file", ".env").is_ok());
        assert!(validate_path("file", "").is_err());
        assert!(validate_path("file", "bad\0path").is_err());
    }
}
