//! Error types for the lanreg-discover crate.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DiscoverError {
    #[error("Invalid subnet {subnet}: {reason}")]
    InvalidSubnet { subnet: String, reason: String },

    #[error("Zone transfer tool not found at path: {path}")]
    ZoneToolNotFound { path: String },

    #[error("Zone transfer for {domain} exited with code {code}: {stderr}")]
    ZoneTransferFailed {
        domain: String,
        code: i32,
        stderr: String,
    },

    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("Registry error: {0}")]
    Registry(#[from] lanreg_registry::RegistryError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, DiscoverError>;
