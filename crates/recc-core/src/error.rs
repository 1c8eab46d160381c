//! Error types for RECC
//!
//! Only genuinely exceptional conditions live here. Transient statuses
//! (a reflection level with too little history, an empty concept store)
//! are tagged results in their own modules, never errors.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("snapshot not found: {0}")]
    StateNotFound(String),

    #[error("malformed state: missing key '{key}'")]
    MalformedState { key: String },

    #[error("collaborator failed: {0}")]
    Collaborator(String),

    #[error("config error: {0}")]
    ConfigError(String),

    #[error("io error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("json error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn malformed(key: impl Into<String>) -> Self {
        Self::MalformedState { key: key.into() }
    }

    pub fn collaborator(message: impl Into<String>) -> Self {
        Self::Collaborator(message.into())
    }
}
