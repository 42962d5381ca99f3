//! Service configuration.
//!
//! Supports configuration via environment variables:
//!
//! ```bash
//! SARAU_GROUP_NAME_MAX_LEN=80            # characters, default 80
//! SARAU_GROUP_DESCRIPTION_MAX_LEN=2000   # characters, default 2000
//! ```

use std::env;
use thiserror::Error;

const DEFAULT_NAME_MAX_LEN: usize = 80;
const DEFAULT_DESCRIPTION_MAX_LEN: usize = 2000;

/// Limits applied when validating group input
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupsConfig {
    /// Maximum group name length in characters
    pub name_max_len: usize,
    /// Maximum description length in characters
    pub description_max_len: usize,
}

impl Default for GroupsConfig {
    fn default() -> Self {
        Self {
            name_max_len: DEFAULT_NAME_MAX_LEN,
            description_max_len: DEFAULT_DESCRIPTION_MAX_LEN,
        }
    }
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {var}: '{value}' (expected a positive integer)")]
    InvalidLimit { var: &'static str, value: String },
}

impl GroupsConfig {
    /// Load configuration from environment variables, falling back to defaults
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            name_max_len: limit_from_env("SARAU_GROUP_NAME_MAX_LEN", DEFAULT_NAME_MAX_LEN)?,
            description_max_len: limit_from_env(
                "SARAU_GROUP_DESCRIPTION_MAX_LEN",
                DEFAULT_DESCRIPTION_MAX_LEN,
            )?,
        })
    }
}

fn limit_from_env(var: &'static str, default: usize) -> Result<usize, ConfigError> {
    match env::var(var) {
        Ok(value) => match value.trim().parse::<usize>() {
            Ok(n) if n > 0 => Ok(n),
            _ => Err(ConfigError::InvalidLimit { var, value }),
        },
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Mutex to serialize tests that modify environment variables
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    const ENV_VARS: &[&str] = &[
        "SARAU_GROUP_NAME_MAX_LEN",
        "SARAU_GROUP_DESCRIPTION_MAX_LEN",
    ];

    struct EnvGuard<'a> {
        _lock: std::sync::MutexGuard<'a, ()>,
    }

    impl EnvGuard<'_> {
        fn new() -> Self {
            let lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
            for var in ENV_VARS {
                env::remove_var(var);
            }
            Self { _lock: lock }
        }
    }

    impl Drop for EnvGuard<'_> {
        fn drop(&mut self) {
            for var in ENV_VARS {
                env::remove_var(var);
            }
        }
    }

    #[test]
    fn defaults_when_unset() {
        let _guard = EnvGuard::new();
        assert_eq!(GroupsConfig::from_env().unwrap(), GroupsConfig::default());
    }

    #[test]
    fn reads_overrides() {
        let _guard = EnvGuard::new();
        env::set_var("SARAU_GROUP_NAME_MAX_LEN", "32");
        env::set_var("SARAU_GROUP_DESCRIPTION_MAX_LEN", " 500 ");

        let config = GroupsConfig::from_env().unwrap();
        assert_eq!(config.name_max_len, 32);
        assert_eq!(config.description_max_len, 500);
    }

    #[test]
    fn rejects_zero_and_garbage() {
        let _guard = EnvGuard::new();
        env::set_var("SARAU_GROUP_NAME_MAX_LEN", "0");
        assert!(matches!(
            GroupsConfig::from_env(),
            Err(ConfigError::InvalidLimit {
                var: "SARAU_GROUP_NAME_MAX_LEN",
                ..
            })
        ));

        env::set_var("SARAU_GROUP_NAME_MAX_LEN", "lots");
        let err = GroupsConfig::from_env().unwrap_err();
        assert!(err.to_string().contains("lots"));
    }
}
