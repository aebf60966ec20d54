//! Text encoder for questions and corpus queries.
//!
//! Providers do the actual embedding; [`Encoder`] wraps one and enforces the
//! caller-supplied timeout and the output dimensionality.

pub mod config;
pub mod provider;
pub mod providers;

pub use config::EmbeddingConfig;
pub use provider::{create_provider, EmbeddingProvider};

use helpdesk_core::{AppError, AppResult};
use std::sync::Arc;
use std::time::Duration;

/// Bounded, validated access to an embedding provider.
#[derive(Debug, Clone)]
pub struct Encoder {
    provider: Arc<dyn EmbeddingProvider>,
    timeout: Duration,
    batch_size: usize,
}

impl Encoder {
    pub fn new(provider: Arc<dyn EmbeddingProvider>, timeout: Duration) -> Self {
        Self {
            provider,
            timeout,
            batch_size: 100,
        }
    }

    /// Create the provider described by `config` and wrap it.
    pub async fn from_config(config: &EmbeddingConfig) -> AppResult<Self> {
        let provider = create_provider(config).await?;

        tracing::debug!(
            "Encoder ready: provider={}, model={}, dimensions={}, timeout={}ms",
            provider.provider_name(),
            provider.model_name(),
            provider.dimensions(),
            config.timeout_ms
        );

        Ok(Self {
            provider,
            timeout: Duration::from_millis(config.timeout_ms),
            batch_size: config.batch_size.max(1),
        })
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn dimensions(&self) -> usize {
        self.provider.dimensions()
    }

    pub fn provider_name(&self) -> &str {
        self.provider.provider_name()
    }

    pub fn model_name(&self) -> &str {
        self.provider.model_name()
    }

    /// Settings this encoder runs with, for comparison against a build manifest.
    pub fn config(&self) -> EmbeddingConfig {
        EmbeddingConfig {
            provider: self.provider_name().to_string(),
            model: self.model_name().to_string(),
            dimensions: self.dimensions(),
            timeout_ms: self.timeout.as_millis() as u64,
            batch_size: self.batch_size,
            ..Default::default()
        }
    }

    /// Encode one text.
    pub async fn encode(&self, text: &str) -> AppResult<Vec<f32>> {
        let vector = tokio::time::timeout(self.timeout, self.provider.embed(text))
            .await
            .map_err(|_| {
                AppError::Encoding(format!(
                    "Encoder did not answer within {}ms",
                    self.timeout.as_millis()
                ))
            })??;

        self.check(&vector)?;
        Ok(vector)
    }

    /// Encode many texts, one provider call per batch. A batch may take the
    /// single-call timeout once per text. `on_batch` receives the number of
    /// texts encoded so far.
    pub async fn encode_batch<F>(&self, texts: &[String], mut on_batch: F) -> AppResult<Vec<Vec<f32>>>
    where
        F: FnMut(usize),
    {
        let mut vectors = Vec::with_capacity(texts.len());

        for batch in texts.chunks(self.batch_size) {
            // Each text gets the single-call budget.
            let budget = self.timeout * batch.len() as u32;
            let encoded = tokio::time::timeout(budget, self.provider.embed_batch(batch))
                .await
                .map_err(|_| {
                    AppError::Encoding(format!(
                        "Encoder did not answer a batch of {} within {}ms",
                        batch.len(),
                        budget.as_millis()
                    ))
                })??;

            if encoded.len() != batch.len() {
                return Err(AppError::Encoding(format!(
                    "Encoder returned {} vectors for {} texts",
                    encoded.len(),
                    batch.len()
                )));
            }

            for vector in &encoded {
                self.check(vector)?;
            }

            vectors.extend(encoded);
            on_batch(vectors.len());
        }

        Ok(vectors)
    }

    fn check(&self, vector: &[f32]) -> AppResult<()> {
        if vector.len() != self.dimensions() {
            return Err(AppError::Encoding(format!(
                "Encoder returned {} dimensions, expected {}",
                vector.len(),
                self.dimensions()
            )));
        }

        if vector.iter().any(|v| !v.is_finite()) {
            return Err(AppError::Encoding(
                "Encoder returned non-finite values".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::providers::trigram::TrigramProvider;

    #[derive(Debug)]
    struct SlowProvider;

    #[async_trait::async_trait]
    impl EmbeddingProvider for SlowProvider {
        fn provider_name(&self) -> &str {
            "slow"
        }

        fn model_name(&self) -> &str {
            "slow-v1"
        }

        fn dimensions(&self) -> usize {
            4
        }

        async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(texts.iter().map(|_| vec![0.5; 4]).collect())
        }
    }

    #[derive(Debug)]
    struct LyingProvider;

    #[async_trait::async_trait]
    impl EmbeddingProvider for LyingProvider {
        fn provider_name(&self) -> &str {
            "lying"
        }

        fn model_name(&self) -> &str {
            "lying-v1"
        }

        fn dimensions(&self) -> usize {
            8
        }

        async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|_| vec![0.5; 3]).collect())
        }
    }

    #[tokio::test]
    async fn test_encode_with_trigram() {
        let encoder = Encoder::from_config(&EmbeddingConfig::default())
            .await
            .unwrap();

        let vector = encoder.encode("grub rescue after dual boot").await.unwrap();
        assert_eq!(vector.len(), 384);
        assert_eq!(encoder.provider_name(), "trigram");
    }

    #[tokio::test]
    async fn test_encode_times_out() {
        let encoder = Encoder::new(Arc::new(SlowProvider), Duration::from_millis(20));

        let result = encoder.encode("anything").await;
        assert!(matches!(result, Err(AppError::Encoding(_))));
    }

    #[tokio::test]
    async fn test_dimension_mismatch_is_encoding_error() {
        let encoder = Encoder::new(Arc::new(LyingProvider), Duration::from_secs(1));

        let result = encoder.encode("anything").await;
        assert!(matches!(result, Err(AppError::Encoding(_))));
    }

    /// Takes 30ms per text, longer than one call may take.
    #[derive(Debug)]
    struct SteadyProvider;

    #[async_trait::async_trait]
    impl EmbeddingProvider for SteadyProvider {
        fn provider_name(&self) -> &str {
            "steady"
        }

        fn model_name(&self) -> &str {
            "steady-v1"
        }

        fn dimensions(&self) -> usize {
            4
        }

        async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
            let mut vectors = Vec::new();
            for _ in texts {
                tokio::time::sleep(Duration::from_millis(30)).await;
                vectors.push(vec![0.5; 4]);
            }
            Ok(vectors)
        }
    }

    #[tokio::test]
    async fn test_batch_budget_scales_with_batch_length() {
        let encoder = Encoder::new(Arc::new(SteadyProvider), Duration::from_millis(100))
            .with_batch_size(10);
        let texts: Vec<String> = (0..10).map(|i| format!("question {}", i)).collect();

        let vectors = encoder.encode_batch(&texts, |_| {}).await.unwrap();
        assert_eq!(vectors.len(), 10);
    }

    #[tokio::test]
    async fn test_encode_batch_reports_progress() {
        let encoder = Encoder::new(Arc::new(TrigramProvider::new(32)), Duration::from_secs(1))
            .with_batch_size(2);

        let texts: Vec<String> = ["apt broken", "no sound", "wifi drops", "grub missing", "x"]
            .iter()
            .map(|s| s.to_string())
            .collect();

        let mut seen = Vec::new();
        let vectors = encoder
            .encode_batch(&texts, |done| seen.push(done))
            .await
            .unwrap();

        assert_eq!(vectors.len(), 5);
        assert_eq!(seen, vec![2, 4, 5]);
    }
}
