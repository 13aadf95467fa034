//! Configuration and detection errors

use thiserror::Error;

use crate::transport::TransportError;
use crate::Speed;

/// Errors found while validating options, before any trial starts
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Mode other than incremental or list
    #[error("Invalid mode '{0}'. Please use 'incremental' or 'list'")]
    InvalidMode(String),

    /// List mode without any speed
    #[error("Empty or invalid baudrate list")]
    EmptyList,

    /// List entry that is not a speed
    #[error("Invalid baudrate list entry '{0}'")]
    InvalidListEntry(String),

    /// `min` not below `max`
    #[error("Invalid baudrate range: min ({min}) must be lower than max ({max})")]
    InvalidRange {
        /// Lowest speed
        min: Speed,
        /// Exclusive upper bound
        max: Speed,
    },

    /// Zero increment
    #[error("Invalid baudrate increment: {0}")]
    InvalidStep(Speed),

    /// Zero speed
    #[error("Invalid baudrate: {0}")]
    InvalidSpeed(Speed),

    /// Reset pin other than dtr or rts
    #[error("Invalid reset pin '{0}'. Please use 'dtr' or 'rts'")]
    InvalidResetPin(String),

    /// Reset direction other than low or high
    #[error("Invalid reset direction '{0}'. Please use 'low' or 'high'")]
    InvalidResetPolarity(String),

    /// Trigger payload that is not raw hex
    #[error("Invalid trigger payload '{0}': expected raw hex without a leading '0x'")]
    InvalidTriggerPayload(String),

    /// Out-of-range numeric option
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue {
        /// Option name
        field: &'static str,
        /// What is wrong with it
        message: String,
    },

    /// Config file could not be read or written
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    /// Config file is not valid JSON
    #[error("Failed to parse config file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Errors that end a detection run
#[derive(Error, Debug)]
pub enum DetectionError {
    /// Options were rejected
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The device went away mid-run
    #[error("Transport lost: {0}")]
    TransportLost(TransportError),
}
