use crate::embedding::{BuildError, EmbeddingError, VectorIndexError};
use crate::retrieval::SearchError;
use crate::storage::PersistenceError;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for supportrag
#[derive(Error, Debug)]
pub enum SupportError {
    /// Configuration related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Configuration validation errors
    #[error("Configuration validation failed: {errors:?}")]
    ConfigValidation { errors: Vec<ValidationError> },

    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: PathBuf },

    /// Invalid configuration value
    #[error("Invalid configuration value at {path}: {message}")]
    InvalidConfigValue { path: String, message: String },

    /// IO errors
    #[error("IO error: {context}: {source}")]
    Io {
        source: std::io::Error,
        context: String,
    },

    /// TOML deserialization errors
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// TOML serialization errors
    #[error("TOML serialization error: {0}")]
    TomlSerialization(#[from] toml::ser::Error),

    /// JSON errors
    #[error("JSON error: {context}: {source}")]
    Json {
        source: serde_json::Error,
        context: String,
    },

    /// Text encoder failures
    #[error(transparent)]
    Embedding(#[from] EmbeddingError),

    /// Similarity index failures
    #[error(transparent)]
    Index(#[from] VectorIndexError),

    /// Index build failures
    #[error(transparent)]
    Build(#[from] BuildError),

    /// Index/entries artifact failures
    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    /// Query-time failures
    #[error(transparent)]
    Search(#[from] SearchError),

    /// The engine was queried before `initialize` completed
    #[error("Retrieval engine is not initialized")]
    EngineNotInitialized,

    /// Generic errors
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Configuration validation error
#[derive(Debug, Clone)]
pub struct ValidationError {
    /// Path to the configuration key that failed validation
    pub path: String,
    /// Error message describing the validation failure
    pub message: String,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Result type for supportrag operations
pub type Result<T> = std::result::Result<T, SupportError>;
