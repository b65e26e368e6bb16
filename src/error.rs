use crate::counters::ResponseBucket;
use thiserror::Error;

/// Errors that can occur while reading counters from the counter source
#[derive(Error, Debug)]
pub enum ReadError {
    #[error("Failed to spawn subprocess: {0}")]
    SubprocessSpawn(String),

    #[error("`{command}` exited with {status}: {stderr}")]
    CommandFailed {
        command: String,
        status: String,
        stderr: String,
    },

    #[error("Malformed OID in counter source output: {0}")]
    MalformedIdentifier(String),

    #[error("Malformed value '{value}' for OID {oid}")]
    MalformedValue { oid: String, value: String },

    #[error("No value available for OID {0}")]
    MissingValue(String),

    #[error("Counter values too large: {0:?} total no longer fits in 64 bits")]
    CounterOverflow(ResponseBucket),
}

/// Errors that can occur during configuration loading
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(String),

    #[error("Invalid configuration value: {0}")]
    ValidationError(String),

    #[error("Server error tolerance must be a non-negative integer, got '{0}'")]
    InvalidTolerance(String),

    #[error("TOML parse error: {0}")]
    TomlError(#[from] toml::de::Error),
}
