//! Encoder selection for a knowledge base.

use crate::types::{BuildManifest, KnowledgeBaseConfig};
use helpdesk_core::config::ProviderConfig;
use helpdesk_core::{AppConfig, AppError, AppResult};
use serde::{Deserialize, Serialize};

/// Resolved embedding configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmbeddingConfig {
    /// Provider name: "trigram" or "ollama"
    pub provider: String,

    /// Model identifier (provider-specific)
    pub model: String,

    /// Embedding vector dimensions
    pub dimensions: usize,

    /// Provider endpoint, for remote providers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    /// Upper bound for one encoder call
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Maximum batch size for embedding requests
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

fn default_timeout_ms() -> u64 {
    30_000
}

fn default_batch_size() -> usize {
    100
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "trigram".to_string(),
            model: "trigram-v1".to_string(),
            dimensions: 384,
            endpoint: None,
            timeout_ms: default_timeout_ms(),
            batch_size: default_batch_size(),
        }
    }
}

impl EmbeddingConfig {
    /// Embedding settings declared by a knowledge base config.
    pub fn from_base(config: &KnowledgeBaseConfig) -> Self {
        Self {
            provider: config.provider.clone(),
            model: config.model.clone(),
            dimensions: config.embedding_dim as usize,
            endpoint: None,
            timeout_ms: config.encode_timeout_ms,
            batch_size: default_batch_size(),
        }
    }

    /// Settings a published build was encoded with.
    pub fn from_manifest(manifest: &BuildManifest) -> Self {
        Self {
            provider: manifest.provider.clone(),
            model: manifest.model.clone(),
            dimensions: manifest.dimensions,
            ..Default::default()
        }
    }

    /// Layer application settings on top: the `embedding` section of
    /// `.helpdesk/config.yaml` first, then explicit provider/model overrides.
    pub fn with_app_config(mut self, app: &AppConfig) -> Self {
        if let Some(settings) = &app.embedding {
            if app.provider.is_none() {
                self.provider = settings.active_provider.clone();
            }
        }

        if let Some(provider) = &app.provider {
            self.provider = provider.clone();
        }

        match app.get_provider_config(&self.provider) {
            Some(ProviderConfig::Ollama {
                endpoint,
                model,
                dimensions,
                timeout,
            }) => {
                self.endpoint = Some(endpoint);
                self.model = model;
                if let Some(dimensions) = dimensions {
                    self.dimensions = dimensions;
                }
                if let Some(timeout) = timeout {
                    self.timeout_ms = timeout;
                }
            }
            Some(ProviderConfig::Trigram { dimensions }) => {
                self.dimensions = dimensions;
            }
            None => {}
        }

        if self.provider == "trigram" {
            self.model = "trigram-v1".to_string();
        }

        if let Some(model) = &app.model {
            self.model = model.clone();
        }

        self
    }

    /// Validate that another config is consistent with this one.
    pub fn validate_consistency(&self, other: &Self) -> AppResult<()> {
        if self.provider != other.provider {
            return Err(AppError::Encoding(format!(
                "Provider mismatch: expected '{}', got '{}'",
                self.provider, other.provider
            )));
        }

        if self.model != other.model {
            return Err(AppError::Encoding(format!(
                "Model mismatch: expected '{}', got '{}'",
                self.model, other.model
            )));
        }

        if self.dimensions != other.dimensions {
            return Err(AppError::Encoding(format!(
                "Dimension mismatch: expected {}, got {}",
                self.dimensions, other.dimensions
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use helpdesk_core::config::EmbeddingSettings;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = EmbeddingConfig::default();
        assert_eq!(config.provider, "trigram");
        assert_eq!(config.model, "trigram-v1");
        assert_eq!(config.dimensions, 384);
        assert_eq!(config.timeout_ms, 30_000);
    }

    #[test]
    fn test_from_base() {
        let base = KnowledgeBaseConfig {
            name: "ubuntu".to_string(),
            embedding_dim: 128,
            encode_timeout_ms: 500,
            ..Default::default()
        };

        let config = EmbeddingConfig::from_base(&base);
        assert_eq!(config.dimensions, 128);
        assert_eq!(config.timeout_ms, 500);
    }

    #[test]
    fn test_app_config_selects_ollama() {
        let mut providers = HashMap::new();
        providers.insert(
            "ollama".to_string(),
            ProviderConfig::Ollama {
                endpoint: "http://gpu-box:11434".to_string(),
                model: "nomic-embed-text".to_string(),
                dimensions: Some(768),
                timeout: Some(5_000),
            },
        );

        let app = AppConfig {
            embedding: Some(EmbeddingSettings {
                active_provider: "ollama".to_string(),
                providers,
            }),
            ..Default::default()
        };

        let config = EmbeddingConfig::default().with_app_config(&app);
        assert_eq!(config.provider, "ollama");
        assert_eq!(config.model, "nomic-embed-text");
        assert_eq!(config.dimensions, 768);
        assert_eq!(config.timeout_ms, 5_000);
        assert_eq!(config.endpoint.as_deref(), Some("http://gpu-box:11434"));
    }

    #[test]
    fn test_explicit_model_override_wins() {
        let app = AppConfig {
            provider: Some("ollama".to_string()),
            model: Some("mxbai-embed-large".to_string()),
            ..Default::default()
        };

        let config = EmbeddingConfig::default().with_app_config(&app);
        assert_eq!(config.provider, "ollama");
        assert_eq!(config.model, "mxbai-embed-large");
    }

    #[test]
    fn test_validate_consistency_provider_mismatch() {
        let config1 = EmbeddingConfig::default();
        let config2 = EmbeddingConfig {
            provider: "ollama".to_string(),
            ..config1.clone()
        };

        let result = config1.validate_consistency(&config2);
        assert!(matches!(result, Err(AppError::Encoding(_))));
        assert!(result.unwrap_err().to_string().contains("Provider mismatch"));
    }

    #[test]
    fn test_validate_consistency_dimension_mismatch() {
        let config1 = EmbeddingConfig::default();
        let config2 = EmbeddingConfig {
            dimensions: 768,
            ..config1.clone()
        };

        let result = config1.validate_consistency(&config2);
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("Dimension mismatch"));
    }
}
