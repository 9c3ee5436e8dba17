use std::path::PathBuf;

use property_client::{ConnectionError, PollingError, PropertyError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("connection error: {0}")]
    Connection(#[from] ConnectionError),

    #[error("property error: {0}")]
    Property(#[from] PropertyError),

    #[error("polling error: {0}")]
    Polling(#[from] PollingError),

    #[error("bridge is not connected to the property service")]
    Disconnected,

    #[error("gauge polling is disabled by configuration")]
    GaugeDisabled,

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid value {value:?} for {var}")]
    InvalidEnv { var: &'static str, value: String },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

pub type Result<T, E = BridgeError> = std::result::Result<T, E>;
