//! Runtime configuration from the environment.
//!
//! | Variable | Meaning | Default |
//! |----------|---------|---------|
//! | `FIELDMAP_REGISTRY_DIR` | Spec registry directory | `.fieldmap/specs` |
//! | `FIELDMAP_SAMPLE_SIZE` | Sample values kept per profiled column | `5` |
//! | `FIELDMAP_DELIMITER` | Force the input delimiter (`\t` for tab) | auto-detect |
//!
//! A `.env` file in the working directory is loaded first when present.
//! Command-line flags take precedence over these values.

use std::env;
use std::path::PathBuf;

use crate::cache::DEFAULT_REGISTRY_DIR;
use crate::error::ConfigError;
use crate::profile::DEFAULT_SAMPLE_SIZE;

pub const REGISTRY_DIR_VAR: &str = "FIELDMAP_REGISTRY_DIR";
pub const SAMPLE_SIZE_VAR: &str = "FIELDMAP_SAMPLE_SIZE";
pub const DELIMITER_VAR: &str = "FIELDMAP_DELIMITER";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub registry_dir: PathBuf,
    pub sample_size: usize,
    pub delimiter: Option<char>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            registry_dir: PathBuf::from(DEFAULT_REGISTRY_DIR),
            sample_size: DEFAULT_SAMPLE_SIZE,
            delimiter: None,
        }
    }
}

impl Config {
    /// Load `.env` if present, then read the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a configuration from any key lookup. Unset or blank keys keep defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(dir) = get(REGISTRY_DIR_VAR) {
            config.registry_dir = PathBuf::from(dir);
        }

        if let Some(raw) = get(SAMPLE_SIZE_VAR) {
            config.sample_size = raw
                .trim()
                .parse::<usize>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| ConfigError::InvalidValue {
                    key: SAMPLE_SIZE_VAR.to_string(),
                    value: raw.clone(),
                    message: "expected a positive integer".to_string(),
                })?;
        }

        if let Some(raw) = lookup(DELIMITER_VAR).filter(|v| !v.is_empty()) {
            config.delimiter = Some(parse_delimiter(&raw).ok_or_else(|| {
                ConfigError::InvalidValue {
                    key: DELIMITER_VAR.to_string(),
                    value: raw.clone(),
                    message: "expected a single ASCII character".to_string(),
                }
            })?);
        }

        Ok(config)
    }
}

/// Accepts one ASCII character, or the escape `\t` for tab.
pub fn parse_delimiter(raw: &str) -> Option<char> {
    if raw == "\\t" {
        return Some('\t');
    }
    let mut chars = raw.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if c.is_ascii() => Some(c),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.sample_size, 5);
        assert_eq!(config.registry_dir, PathBuf::from(".fieldmap/specs"));
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup(&[
            (REGISTRY_DIR_VAR, "/tmp/specs"),
            (SAMPLE_SIZE_VAR, " 12 "),
            (DELIMITER_VAR, "\\t"),
        ]))
        .unwrap();
        assert_eq!(config.registry_dir, PathBuf::from("/tmp/specs"));
        assert_eq!(config.sample_size, 12);
        assert_eq!(config.delimiter, Some('\t'));
    }

    #[test]
    fn test_invalid_values() {
        let err = Config::from_lookup(lookup(&[(SAMPLE_SIZE_VAR, "many")])).unwrap_err();
        assert!(err.to_string().contains(SAMPLE_SIZE_VAR));

        assert!(Config::from_lookup(lookup(&[(SAMPLE_SIZE_VAR, "0")])).is_err());
        assert!(Config::from_lookup(lookup(&[(DELIMITER_VAR, ";;")])).is_err());
    }

    #[test]
    fn test_parse_delimiter() {
        assert_eq!(parse_delimiter(";"), Some(';'));
        assert_eq!(parse_delimiter("|"), Some('|'));
        assert_eq!(parse_delimiter("é"), None);
        assert_eq!(parse_delimiter(""), None);
    }
}
