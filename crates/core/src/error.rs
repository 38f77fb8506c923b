//! Error types shared across the workspace

use thiserror::Error;

/// Preference store error
#[derive(Debug, Error)]
pub enum PrefError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Unique index violation on '{field}': duplicate key '{key}'")]
    UniqueViolation { field: String, key: String },

    #[error("Index not found: {0}")]
    IndexMissing(String),

    #[error("Invalid collection name: {0}")]
    InvalidCollectionName(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Runtime error: {0}")]
    Runtime(String),
}

pub type Result<T> = std::result::Result<T, PrefError>;
