use crate::capability::RepresentationSet;
use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Config parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("No field layout known for host version {0}")]
    UnknownHostVersion(String),

    #[error("Invalid log level: {0}")]
    InvalidLogLevel(String),
}

#[derive(Debug, Error)]
pub enum ShimError {
    /// Every representation that could carry out the operation is unavailable.
    #[error("Failed to {operation} using a known method (tried {tried:?})")]
    NoSupportedRepresentation {
        operation: &'static str,
        tried: RepresentationSet,
    },

    #[error("Chunk ({x}, {z}) is no longer attached to a world")]
    Detached { x: i32, z: i32 },

    #[error("A ChunkUtil is already installed for this process")]
    AlreadyInstalled,

    #[error(transparent)]
    Config(#[from] ConfigError),
}

pub type Result<T> = std::result::Result<T, ShimError>;
