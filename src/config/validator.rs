use crate::config::{Config, SCHEMA_VERSION};
use crate::error::{Result, SupportError, ValidationError};

/// Configuration validator
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the configuration, collecting every violation
    pub fn validate(config: &Config) -> Result<()> {
        let mut errors = Vec::new();

        Self::validate_schema_version(config, &mut errors);
        Self::validate_sources(config, &mut errors);
        Self::validate_embedding(config, &mut errors);
        Self::validate_index(config, &mut errors);
        Self::validate_retrieval(config, &mut errors);

        if errors.is_empty() {
            Ok(())
        } else {
            Err(SupportError::ConfigValidation { errors })
        }
    }

    fn validate_schema_version(config: &Config, errors: &mut Vec<ValidationError>) {
        let version = &config.meta.schema_version;
        if version != SCHEMA_VERSION {
            errors.push(ValidationError::new(
                "_meta.schema_version",
                format!("Unsupported schema version: {}", version),
            ));
        }
    }

    fn validate_sources(config: &Config, errors: &mut Vec<ValidationError>) {
        // Existence is not checked: a missing source degrades to an empty table
        let sources = [
            ("sources.faq_file", &config.sources.faq_file),
            ("sources.order_file", &config.sources.order_file),
            ("sources.restaurant_file", &config.sources.restaurant_file),
        ];

        for (key, path) in sources {
            if path.as_os_str().is_empty() {
                errors.push(ValidationError::new(key, "Source path cannot be empty"));
            }
        }
    }

    fn validate_embedding(config: &Config, errors: &mut Vec<ValidationError>) {
        if config.embedding.batch_size == 0 {
            errors.push(ValidationError::new(
                "embedding.batch_size",
                "Batch size must be greater than 0",
            ));
        }

        if config.embedding.model.is_empty() {
            errors.push(ValidationError::new(
                "embedding.model",
                "Model name cannot be empty",
            ));
        }
    }

    fn validate_index(config: &Config, errors: &mut Vec<ValidationError>) {
        if config.index.vector_dim == 0 {
            errors.push(ValidationError::new(
                "index.vector_dim",
                "Vector dimension must be greater than 0",
            ));
        }

        if config.index.path.file_stem().is_none() {
            errors.push(ValidationError::new(
                "index.path",
                format!(
                    "Index path must name a file, got '{}'",
                    config.index.path.display()
                ),
            ));
        }

        if config.index.entries_suffix.is_empty() {
            errors.push(ValidationError::new(
                "index.entries_suffix",
                "Entries suffix cannot be empty",
            ));
        } else if config.index.entries_suffix.contains(['/', '\\']) {
            errors.push(ValidationError::new(
                "index.entries_suffix",
                "Entries suffix cannot contain path separators",
            ));
        }
    }

    fn validate_retrieval(config: &Config, errors: &mut Vec<ValidationError>) {
        if config.retrieval.default_k == 0 {
            errors.push(ValidationError::new(
                "retrieval.default_k",
                "default_k must be greater than 0",
            ));
        }

        let threshold = config.retrieval.relevance_threshold;
        if !(-1.0..=1.0).contains(&threshold) {
            errors.push(ValidationError::new(
                "retrieval.relevance_threshold",
                format!("Threshold must be between -1.0 and 1.0, got {}", threshold),
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_collects_all_errors() {
        let mut config = Config::default();
        config.meta.schema_version = "0.9".to_string();
        config.embedding.batch_size = 0;
        config.index.path = PathBuf::new();
        config.retrieval.relevance_threshold = 1.5;

        match ConfigValidator::validate(&config) {
            Err(SupportError::ConfigValidation { errors }) => {
                let paths: Vec<&str> = errors.iter().map(|e| e.path.as_str()).collect();
                assert!(paths.contains(&"_meta.schema_version"));
                assert!(paths.contains(&"embedding.batch_size"));
                assert!(paths.contains(&"index.path"));
                assert!(paths.contains(&"retrieval.relevance_threshold"));
            }
            other => panic!("expected validation failure, got {:?}", other),
        }
    }

    #[test]
    fn test_rejects_suffix_with_separator() {
        let mut config = Config::default();
        config.index.entries_suffix = "../escape".to_string();
        assert!(ConfigValidator::validate(&config).is_err());
    }
}
