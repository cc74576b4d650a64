//! Configuration management for supportrag
//!
//! Loads the TOML configuration, applies `SUPPORTRAG_*` environment overrides
//! and validates the result before anything else is constructed.

use crate::error::{Result, SupportError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

mod validator;

pub use validator::ConfigValidator;

/// Current configuration schema version
pub const SCHEMA_VERSION: &str = "1.0.0";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(rename = "_meta")]
    pub meta: MetaConfig,
    pub sources: SourcesConfig,
    pub embedding: EmbeddingConfig,
    pub index: IndexConfig,
    pub retrieval: RetrievalConfig,
}

/// Metadata about the configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetaConfig {
    pub schema_version: String,
    #[serde(default = "current_timestamp")]
    pub created_at: String,
    #[serde(default = "current_timestamp")]
    pub last_modified: String,
}

fn current_timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Read-only JSON tables the knowledge store and tools are built from
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourcesConfig {
    pub faq_file: PathBuf,
    pub order_file: PathBuf,
    pub restaurant_file: PathBuf,
}

/// Embedding configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Model name (e.g., "all-MiniLM-L6-v2")
    pub model: String,
    /// Number of texts sent to the encoder per call
    pub batch_size: usize,
}

/// Persisted index configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Index artifact path; the entries artifact is derived from it
    pub path: PathBuf,
    /// Vector dimension (must match the encoder)
    pub vector_dim: usize,
    /// Suffix appended to the index file stem for the entries artifact
    pub entries_suffix: String,
}

/// Query defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    pub default_k: usize,
    pub relevance_threshold: f32,
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(SupportError::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| SupportError::Io {
            source: e,
            context: format!("Failed to read config file: {:?}", path),
        })?;
        let config: Config = toml::from_str(&content)?;

        config.resolve()
    }

    /// Apply environment overrides, then validate the result
    pub fn resolve(self) -> Result<Self> {
        self.resolve_with(std::env::vars())
    }

    fn resolve_with<I>(mut self, vars: I) -> Result<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        self.apply_overrides(vars);
        ConfigValidator::validate(&self)?;
        Ok(self)
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|e| SupportError::Io {
            source: e,
            context: format!("Failed to write config file: {:?}", path),
        })?;
        Ok(())
    }

    /// Apply overrides in the form SUPPORTRAG_SECTION__KEY=value
    fn apply_overrides<I>(&mut self, vars: I)
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (key, value) in vars {
            if let Some(config_key) = key.strip_prefix("SUPPORTRAG_") {
                if let Err(e) = self.set_value_from_env(config_key, &value) {
                    tracing::warn!("Failed to apply env override {}: {}", key, e);
                }
            }
        }
    }

    fn set_value_from_env(&mut self, path: &str, value: &str) -> Result<()> {
        match path {
            "EMBEDDING__MODEL" => {
                self.embedding.model = value.to_string();
            }
            "INDEX__PATH" => {
                self.index.path = PathBuf::from(value);
            }
            "RETRIEVAL__RELEVANCE_THRESHOLD" => {
                self.retrieval.relevance_threshold =
                    value.parse().map_err(|_| SupportError::InvalidConfigValue {
                        path: path.to_string(),
                        message: format!("Cannot parse '{}' as a number", value),
                    })?;
            }
            "SOURCES__FAQ_FILE" => {
                self.sources.faq_file = PathBuf::from(value);
            }
            "SOURCES__ORDER_FILE" => {
                self.sources.order_file = PathBuf::from(value);
            }
            "SOURCES__RESTAURANT_FILE" => {
                self.sources.restaurant_file = PathBuf::from(value);
            }
            _ => {
                tracing::debug!("Unknown env config key: {}", path);
            }
        }
        Ok(())
    }

    /// Get the default configuration file path
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| SupportError::Config("Cannot determine config directory".to_string()))?;

        Ok(config_dir.join("supportrag").join("config.toml"))
    }
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = PathBuf::from("data");

        Self {
            meta: MetaConfig {
                schema_version: SCHEMA_VERSION.to_string(),
                created_at: current_timestamp(),
                last_modified: current_timestamp(),
            },
            sources: SourcesConfig {
                faq_file: data_dir.join("faqs.json"),
                order_file: data_dir.join("order_database.json"),
                restaurant_file: data_dir.join("restaurant_data.json"),
            },
            embedding: EmbeddingConfig {
                model: "all-MiniLM-L6-v2".to_string(),
                batch_size: 32,
            },
            index: IndexConfig {
                path: data_dir.join("faiss_index.bin"),
                vector_dim: 384,
                entries_suffix: "_faqs".to_string(),
            },
            retrieval: RetrievalConfig {
                default_k: 5,
                relevance_threshold: 0.3,
            },
        }
    }
}
