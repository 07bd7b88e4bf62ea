//! Environment helpers shared by the provisioning clients.

use std::str::FromStr;

use taskforge_core::{Error, Result};

/// Read a variable that must be set and non-empty.
pub fn required_env(key: &str) -> Result<String> {
    match std::env::var(key) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(Error::Config(format!(
            "{} environment variable is required",
            key
        ))),
    }
}

/// Read a variable, falling back to `default` when unset.
pub fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Read and parse a variable, falling back to `default` when unset.
///
/// A value that is set but does not parse is a configuration error.
pub fn parse_env_or<T: FromStr>(key: &str, default: T) -> Result<T> {
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| Error::Config(format!("{} has an invalid value: {}", key, raw))),
        Err(_) => Ok(default),
    }
}

/// How tenant schemas are brought up to date after allocation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MigrationMode {
    /// Run the migrations embedded in the binary.
    #[default]
    Embedded,
    /// Shell out to an external migration command.
    Command,
}

impl FromStr for MigrationMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "embedded" => Ok(MigrationMode::Embedded),
            "command" => Ok(MigrationMode::Command),
            other => Err(Error::Config(format!("unknown migration mode: {}", other))),
        }
    }
}
