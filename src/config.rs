//! Runtime configuration, read from the environment.

use std::env;
use thiserror::Error;

/// Errors raised while loading [`LedgerConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value '{value}' for {var}: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerConfig {
    /// How many times a decision is re-made after losing an optimistic write
    /// before the operation fails with a concurrency conflict.
    pub max_conflict_retries: u32,
    /// Log filter used when `RUST_LOG` is not set.
    pub log_directive: String,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            max_conflict_retries: 3,
            log_directive: "warn".to_string(),
        }
    }
}

impl LedgerConfig {
    pub const MAX_CONFLICT_RETRIES_VAR: &'static str = "LEDGER_MAX_CONFLICT_RETRIES";
    pub const LOG_VAR: &'static str = "LEDGER_LOG";

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| env::var(var).ok())
    }

    /// Build a config from an arbitrary variable lookup, falling back to the
    /// defaults for unset variables.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let max_conflict_retries = match lookup(Self::MAX_CONFLICT_RETRIES_VAR) {
            Some(value) => value.trim().parse::<u32>().map_err(|e| {
                ConfigError::Invalid {
                    var: Self::MAX_CONFLICT_RETRIES_VAR,
                    value,
                    reason: e.to_string(),
                }
            })?,
            None => defaults.max_conflict_retries,
        };

        let log_directive = lookup(Self::LOG_VAR)
            .filter(|value| !value.trim().is_empty())
            .unwrap_or(defaults.log_directive);

        Ok(Self {
            max_conflict_retries,
            log_directive,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |var| vars.get(var).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        let config = LedgerConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, LedgerConfig::default());
        assert_eq!(config.max_conflict_retries, 3);
        assert_eq!(config.log_directive, "warn");
    }

    #[test]
    fn reads_overrides() {
        let config = LedgerConfig::from_lookup(lookup(&[
            ("LEDGER_MAX_CONFLICT_RETRIES", " 5 "),
            ("LEDGER_LOG", "client_ledger=debug"),
        ]))
        .unwrap();
        assert_eq!(config.max_conflict_retries, 5);
        assert_eq!(config.log_directive, "client_ledger=debug");
    }

    #[test]
    fn blank_log_directive_falls_back() {
        let config = LedgerConfig::from_lookup(lookup(&[("LEDGER_LOG", "  ")])).unwrap();
        assert_eq!(config.log_directive, "warn");
    }

    #[test]
    fn rejects_bad_retry_count() {
        let err = LedgerConfig::from_lookup(lookup(&[("LEDGER_MAX_CONFLICT_RETRIES", "many")]))
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                var: "LEDGER_MAX_CONFLICT_RETRIES",
                ..
            }
        ));
        assert!(err.to_string().contains("many"));
    }
}
