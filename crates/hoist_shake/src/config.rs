use std::fs;
use std::path::Path;

use anyhow::{anyhow, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_EXPORTS_PATTERN: &str = r"^\$[0-9]+\$exports$";
pub const DEFAULT_WILDCARD_HELPER: &str = "$parcel$exportWildcard";

/// Naming conventions of the module concatenation step, plus the assignment
/// policy of the pass.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct ShakeConfig {
    pub exports_pattern: String,
    pub wildcard_helper: String,
    /// keep export and bare assignments whose assigned value may have side
    /// effects
    pub strict_assignments: bool,
}

impl Default for ShakeConfig {
    fn default() -> Self {
        Self {
            exports_pattern: DEFAULT_EXPORTS_PATTERN.to_string(),
            wildcard_helper: DEFAULT_WILDCARD_HELPER.to_string(),
            strict_assignments: false,
        }
    }
}

impl ShakeConfig {
    pub fn from_json_str(content: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(content)
            .map_err(|e| anyhow!(ConfigError::InvalidJson(e.to_string())))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            anyhow!(ConfigError::ReadFailed {
                path: path.to_string_lossy().to_string(),
                message: e.to_string(),
            })
        })?;
        Self::from_json_str(&content)
    }

    pub fn validate(&self) -> Result<()> {
        self.exports_regex()?;
        if self.wildcard_helper.is_empty() {
            return Err(anyhow!(ConfigError::EmptyWildcardHelper));
        }
        Ok(())
    }

    pub fn exports_regex(&self) -> Result<Regex> {
        Regex::new(&self.exports_pattern).map_err(|e| {
            anyhow!(ConfigError::InvalidExportsPattern {
                pattern: self.exports_pattern.clone(),
                message: e.to_string(),
            })
        })
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}: {message}")]
    ReadFailed { path: String, message: String },
    #[error("invalid config json: {0}")]
    InvalidJson(String),
    #[error("exportsPattern '{pattern}' is not a valid regex: {message}")]
    InvalidExportsPattern { pattern: String, message: String },
    #[error("wildcardHelper must not be empty")]
    EmptyWildcardHelper,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ShakeConfig::default();
        let re = config.exports_regex().unwrap();
        assert!(re.is_match("$0$exports"));
        assert!(re.is_match("$12$exports"));
        assert!(!re.is_match("$a$exports"));
        assert!(!re.is_match("x$0$exports"));
        assert!(!re.is_match("$0$exports2"));
        assert_eq!(config.wildcard_helper, "$parcel$exportWildcard");
        assert!(!config.strict_assignments);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = ShakeConfig::from_json_str(r#"{ "strictAssignments": true }"#).unwrap();
        assert!(config.strict_assignments);
        assert_eq!(config.exports_pattern, DEFAULT_EXPORTS_PATTERN);
        assert_eq!(config.wildcard_helper, DEFAULT_WILDCARD_HELPER);
    }

    #[test]
    fn test_custom_conventions() {
        let config = ShakeConfig::from_json_str(
            r#"{ "exportsPattern": "^__ns_\\d+$", "wildcardHelper": "__reexport" }"#,
        )
        .unwrap();
        assert!(config.exports_regex().unwrap().is_match("__ns_3"));
        assert_eq!(config.wildcard_helper, "__reexport");
    }

    #[test]
    fn test_invalid_pattern_is_rejected() {
        let err = ShakeConfig::from_json_str(r#"{ "exportsPattern": "(" }"#).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ConfigError>(),
            Some(ConfigError::InvalidExportsPattern { .. })
        ));
    }

    #[test]
    fn test_invalid_json_and_empty_helper() {
        let err = ShakeConfig::from_json_str("{").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ConfigError>(),
            Some(ConfigError::InvalidJson(_))
        ));

        let err = ShakeConfig::from_json_str(r#"{ "wildcardHelper": "" }"#).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ConfigError>(),
            Some(ConfigError::EmptyWildcardHelper)
        ));
    }

    #[test]
    fn test_missing_file() {
        let err = ShakeConfig::from_file(Path::new("does/not/exist.json")).unwrap_err();
        assert!(err.to_string().starts_with("failed to read config"));
    }
}
