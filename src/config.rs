use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use dotenvy::dotenv;
use thiserror::Error;

use crate::store::file::DEFAULT_STORE_PATH;

pub const STORE_PATH_VAR: &str = "ENROL_STORE_PATH";
pub const WRITE_FAILURE_VAR: &str = "ENROL_ON_WRITE_FAILURE";
pub const RESUME_SEQUENCE_VAR: &str = "ENROL_RESUME_SEQUENCE";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} must be `report` or `fail`, got {value:?}")]
    InvalidPolicy { var: &'static str, value: String },

    #[error("{var} must be true/false/1/0, got {value:?}")]
    InvalidFlag { var: &'static str, value: String },

    #[error("{var} contains invalid unicode")]
    NotUnicode { var: &'static str },
}

/// What a registration does when the record was accepted but could not be
/// written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum PersistencePolicy {
    /// Log the failure and still report the registration as successful.
    #[default]
    Report,
    /// Treat the failed write as a failed registration.
    Fail,
}

impl FromStr for PersistencePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "report" => Ok(PersistencePolicy::Report),
            "fail" => Ok(PersistencePolicy::Fail),
            other => Err(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub store_path: PathBuf,
    pub on_write_failure: PersistencePolicy,
    pub resume_sequence: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store_path: PathBuf::from(DEFAULT_STORE_PATH),
            on_write_failure: PersistencePolicy::default(),
            resume_sequence: false,
        }
    }
}

impl Config {
    /// Reads `.env` if there is one, then the `ENROL_*` variables. Unset
    /// variables keep their defaults.
    #[tracing::instrument(name = "config_load")]
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv().ok();
        Self::from_lookup(|var| env::var(var))
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&'static str) -> Result<String, env::VarError>,
    {
        let read = |var: &'static str| match lookup(var) {
            Ok(value) => Ok(Some(value)),
            Err(env::VarError::NotPresent) => Ok(None),
            Err(env::VarError::NotUnicode(_)) => Err(ConfigError::NotUnicode { var }),
        };

        let mut config = Self::default();

        if let Some(path) = read(STORE_PATH_VAR)? {
            config.store_path = PathBuf::from(path);
        }
        if let Some(value) = read(WRITE_FAILURE_VAR)? {
            config.on_write_failure = value
                .parse::<PersistencePolicy>()
                .map_err(|_| ConfigError::InvalidPolicy { var: WRITE_FAILURE_VAR, value })?;
        }
        if let Some(value) = read(RESUME_SEQUENCE_VAR)? {
            config.resume_sequence = parse_flag(RESUME_SEQUENCE_VAR, value)?;
        }

        tracing::debug!(
            store_path = %config.store_path.display(),
            on_write_failure = ?config.on_write_failure,
            resume_sequence = config.resume_sequence,
            "Configuration loaded"
        );

        Ok(config)
    }
}

fn parse_flag(var: &'static str, value: String) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" | "" => Ok(false),
        _ => Err(ConfigError::InvalidFlag { var, value }),
    }
}
