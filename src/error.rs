//! Error types for configuration loading and validation

use thiserror::Error;

/// Errors raised before any simulation state is created.
///
/// Everything that can go wrong during a run (unplaceable groups, stagnation,
/// residual overlap) is reported through run reports instead.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config value '{field}': {reason}")]
    Invalid { field: String, reason: String },
}

impl ConfigError {
    /// Create an invalid-value error for a named config key
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Config key the error refers to, if any
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::Invalid { field, .. } => Some(field),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_display() {
        let err = ConfigError::invalid("growth.growth_step", "must be positive");
        assert_eq!(
            err.to_string(),
            "invalid config value 'growth.growth_step': must be positive"
        );
        assert_eq!(err.field(), Some("growth.growth_step"));
    }

    #[test]
    fn test_parse_error_has_no_field() {
        let err: ConfigError = toml::from_str::<toml::Value>("= broken")
            .map_err(ConfigError::from)
            .unwrap_err();
        assert!(err.to_string().starts_with("failed to parse config TOML"));
        assert_eq!(err.field(), None);
    }
}
