//! Embedding generation service with dimension validation and batching

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;
use tracing::warn;

use super::client::EmbeddingClient;
use super::EmbeddingConfig;
use super::EmbeddingGate;
use super::MAX_BATCH_SIZE;
use crate::errors::Result;
use crate::errors::VedaRagError;

/// Service for generating embeddings with batching and startup validation
pub struct EmbeddingService {
    client: Arc<EmbeddingClient>,
    config: EmbeddingConfig,
    batch_concurrency: usize,
}

impl EmbeddingService {
    /// Create a new embedding service
    pub fn new(config: &crate::config::AppConfig) -> Result<Self> {
        let embedding_config = EmbeddingConfig::from_app_config(config)?;
        let client = EmbeddingClient::new(
            embedding_config.provider,
            embedding_config.model.clone(),
            embedding_config.endpoint.clone(),
            embedding_config.api_key.clone(),
            embedding_config.timeout_secs,
        )?;

        Ok(Self {
            client: Arc::new(client),
            config: embedding_config,
            batch_concurrency: config.embedding_concurrency(),
        })
    }

    /// Create from custom config
    pub fn from_config(config: EmbeddingConfig, batch_concurrency: usize) -> Result<Self> {
        let client = EmbeddingClient::new(
            config.provider,
            config.model.clone(),
            config.endpoint.clone(),
            config.api_key.clone(),
            config.timeout_secs,
        )?;

        Ok(Self {
            client: Arc::new(client),
            config,
            batch_concurrency,
        })
    }

    /// Validate the deployment once at startup: issue a probe embedding and
    /// check the provider really returns the configured dimension.
    ///
    /// # Errors
    /// - `DimensionMismatch` when the provider disagrees with the config
    /// - `EmbeddingUnavailable` / `EmbeddingTimeout` when the probe fails
    pub async fn validate(&self) -> Result<()> {
        let probe = self.client.generate("om").await?;
        if probe.len() != self.config.dimension {
            return Err(VedaRagError::DimensionMismatch {
                expected: self.config.dimension,
                actual: probe.len(),
            });
        }
        info!(
            "Embedding gate validated: {} ({}d)",
            self.config.model, self.config.dimension
        );
        Ok(())
    }

    /// Generate embedding for a single text
    pub async fn generate(&self, text: &str) -> Result<Vec<f32>> {
        let vector = self.client.generate(text).await?;
        self.check_dimension(vector.len())?;
        Ok(vector)
    }

    /// Generate embeddings for multiple texts in batch
    pub async fn generate_batch(&self, texts: Vec<&str>) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let mut embeddings = if texts.len() <= MAX_BATCH_SIZE {
            self.client
                .generate_batch(texts, self.batch_concurrency)
                .await?
        } else {
            // Split into provider-sized batches
            let mut all_embeddings = Vec::with_capacity(texts.len());
            for chunk in texts.chunks(MAX_BATCH_SIZE) {
                let chunk_embeddings = self
                    .client
                    .generate_batch(chunk.to_vec(), self.batch_concurrency)
                    .await?;
                all_embeddings.extend(chunk_embeddings);
            }
            all_embeddings
        };

        for embedding in &mut embeddings {
            self.check_dimension(embedding.len())?;
        }

        Ok(embeddings)
    }

    fn check_dimension(&self, actual: usize) -> Result<()> {
        if actual != self.config.dimension {
            warn!(
                "Embedding gate returned {actual}d vector, expected {}d",
                self.config.dimension
            );
            return Err(VedaRagError::DimensionMismatch {
                expected: self.config.dimension,
                actual,
            });
        }
        Ok(())
    }

    /// Get the embedding dimension
    #[must_use]
    pub const fn dimension(&self) -> usize {
        self.config.dimension
    }

    /// Get the model name
    #[must_use]
    pub fn model(&self) -> &str {
        &self.config.model
    }
}

#[async_trait]
impl EmbeddingGate for EmbeddingService {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.generate(text).await
    }

    fn dimension(&self) -> usize {
        self.config.dimension
    }
}
