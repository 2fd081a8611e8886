//! Selection configuration.
//!
//! Defaults can be overridden from YAML (file or string) or from the
//! environment:
//!
//! ```yaml
//! max_tools: 12
//! candidate_fan_out: 5
//! dependency_decay: 0.5
//! bm25:
//!   k1: 1.2
//!   b: 0.75
//! ```
//!
//! | Variable                  | Field               |
//! |---------------------------|---------------------|
//! | `CREWAI_SKILLS_MAX_TOOLS` | `max_tools`         |
//! | `CREWAI_SKILLS_FAN_OUT`   | `candidate_fan_out` |
//! | `CREWAI_SKILLS_DECAY`     | `dependency_decay`  |
//!
//! The `bm25` block takes effect through
//! [`Bm25Index::from_config`](crate::search::Bm25Index::from_config).

use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::search::Bm25Params;

pub const ENV_MAX_TOOLS: &str = "CREWAI_SKILLS_MAX_TOOLS";
pub const ENV_FAN_OUT: &str = "CREWAI_SKILLS_FAN_OUT";
pub const ENV_DECAY: &str = "CREWAI_SKILLS_DECAY";

/// Errors from loading or validating a [`SelectionConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Invalid value for {var}: {value:?}")]
    Env { var: String, value: String },
}

/// Tuning knobs of the selection engine.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SelectionConfig {
    /// Upper bound on capabilities returned per query
    #[serde(default = "default_max_tools")]
    pub max_tools: usize,

    /// Number of bundles requested from the relevance index
    #[serde(default = "default_fan_out")]
    pub candidate_fan_out: usize,

    /// Score multiplier per dependency hop
    #[serde(default = "default_decay")]
    pub dependency_decay: f64,

    #[serde(default)]
    pub bm25: Bm25Params,
}

fn default_max_tools() -> usize {
    20
}

fn default_fan_out() -> usize {
    10
}

fn default_decay() -> f64 {
    0.5
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            max_tools: default_max_tools(),
            candidate_fan_out: default_fan_out(),
            dependency_decay: default_decay(),
            bm25: Bm25Params::default(),
        }
    }
}

impl SelectionConfig {
    pub fn with_max_tools(mut self, max_tools: usize) -> Self {
        self.max_tools = max_tools;
        self
    }

    pub fn with_fan_out(mut self, candidate_fan_out: usize) -> Self {
        self.candidate_fan_out = candidate_fan_out;
        self
    }

    pub fn with_decay(mut self, dependency_decay: f64) -> Self {
        self.dependency_decay = dependency_decay;
        self
    }

    /// Parse and validate a YAML document. Missing fields take defaults.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    /// Defaults overlaid with the `CREWAI_SKILLS_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_with(|var| std::env::var(var).ok())
    }

    /// Like [`SelectionConfig::from_env`] with a custom variable lookup.
    pub fn from_env_with<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(value) = env_value(&lookup, ENV_MAX_TOOLS)? {
            config.max_tools = value;
        }
        if let Some(value) = env_value(&lookup, ENV_FAN_OUT)? {
            config.candidate_fan_out = value;
        }
        if let Some(value) = env_value(&lookup, ENV_DECAY)? {
            config.dependency_decay = value;
        }
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_tools == 0 {
            return Err(ConfigError::Invalid("max_tools must be at least 1".into()));
        }
        if self.candidate_fan_out == 0 {
            return Err(ConfigError::Invalid(
                "candidate_fan_out must be at least 1".into(),
            ));
        }
        if !(self.dependency_decay > 0.0 && self.dependency_decay <= 1.0) {
            return Err(ConfigError::Invalid(format!(
                "dependency_decay must be in (0, 1], got {}",
                self.dependency_decay
            )));
        }
        if !(self.bm25.k1 >= 0.0) {
            return Err(ConfigError::Invalid(format!(
                "bm25.k1 must be non-negative, got {}",
                self.bm25.k1
            )));
        }
        if !(0.0..=1.0).contains(&self.bm25.b) {
            return Err(ConfigError::Invalid(format!(
                "bm25.b must be in [0, 1], got {}",
                self.bm25.b
            )));
        }
        Ok(())
    }
}

fn env_value<T, F>(lookup: &F, var: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(var) else {
        return Ok(None);
    };
    raw.trim()
        .parse()
        .map(Some)
        .map_err(|_| ConfigError::Env {
            var: var.to_string(),
            value: raw,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |var| vars.get(var).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = SelectionConfig::default();
        assert_eq!(config.max_tools, 20);
        assert_eq!(config.candidate_fan_out, 10);
        assert_eq!(config.dependency_decay, 0.5);
        assert_eq!(config.bm25, Bm25Params { k1: 1.2, b: 0.75 });
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config = SelectionConfig::from_yaml_str("max_tools: 5\nbm25:\n  b: 0.5\n").unwrap();
        assert_eq!(config.max_tools, 5);
        assert_eq!(config.candidate_fan_out, 10);
        assert_eq!(config.bm25.k1, 1.2);
        assert_eq!(config.bm25.b, 0.5);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        assert!(matches!(
            SelectionConfig::from_yaml_str("max_tools: 0"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            SelectionConfig::from_yaml_str("dependency_decay: 1.5"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            SelectionConfig::from_yaml_str("dependency_decay: 0"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            SelectionConfig::from_yaml_str("bm25:\n  b: 2.0"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            SelectionConfig::from_yaml_str("max_tools: many"),
            Err(ConfigError::Yaml(_))
        ));
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("selection.yaml");
        std::fs::write(&path, "candidate_fan_out: 3\ndependency_decay: 0.25\n").unwrap();

        let config = SelectionConfig::from_file(&path).unwrap();
        assert_eq!(config.candidate_fan_out, 3);
        assert_eq!(config.dependency_decay, 0.25);
        assert!(matches!(
            SelectionConfig::from_file(&dir.path().join("missing.yaml")),
            Err(ConfigError::Io(_))
        ));
    }

    #[test]
    fn test_env_overlay() {
        let config = SelectionConfig::from_env_with(lookup(&[
            (ENV_MAX_TOOLS, "8"),
            (ENV_DECAY, " 0.75 "),
        ]))
        .unwrap();
        assert_eq!(config.max_tools, 8);
        assert_eq!(config.candidate_fan_out, 10);
        assert_eq!(config.dependency_decay, 0.75);

        assert_eq!(
            SelectionConfig::from_env_with(lookup(&[])).unwrap(),
            SelectionConfig::default()
        );
    }

    #[test]
    fn test_env_parse_errors_name_the_variable() {
        let err = SelectionConfig::from_env_with(lookup(&[(ENV_FAN_OUT, "ten")])).unwrap_err();
        match err {
            ConfigError::Env { var, value } => {
                assert_eq!(var, ENV_FAN_OUT);
                assert_eq!(value, "ten");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(matches!(
            SelectionConfig::from_env_with(lookup(&[(ENV_MAX_TOOLS, "0")])),
            Err(ConfigError::Invalid(_))
        ));
    }
}
