//! Embedding generation module
//!
//! This module provides the embedding gate: the single boundary through
//! which chunk and query text becomes fixed-dimension vectors. Providers:
//! - OpenAI (text-embedding-3-small, etc.)
//! - Ollama (local models)
//!
//! The rest of the crate depends on [`EmbeddingGate`] only, so tests and
//! alternative backends can substitute the whole provider stack.
//!
//! # Examples
//!
//! ```rust,no_run
//! use vedarag::embeddings::EmbeddingService;
//! use vedarag::config::AppConfig;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AppConfig::load()?;
//!     let service = EmbeddingService::new(&config)?;
//!
//!     let embedding = service.generate("What is dharma?").await?;
//!     println!("Generated embedding with {} dimensions", embedding.len());
//!
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod generator;

pub use client::EmbeddingClient;
pub use client::EmbeddingProvider;
pub use generator::EmbeddingService;

use async_trait::async_trait;

use crate::errors::Result;

/// Default embedding dimension (BAAI/bge-small and nomic-embed class models)
pub const DEFAULT_EMBEDDING_DIM: usize = 384;

/// Maximum batch size for embedding generation
pub const MAX_BATCH_SIZE: usize = 100;

/// The external embedding model, treated as a black-box function
/// text → fixed-length vector.
///
/// Implementations must fail with `EmbeddingUnavailable` on hard provider
/// errors and `EmbeddingTimeout` on deadline expiry so callers can apply
/// different retry policies to each.
#[async_trait]
pub trait EmbeddingGate: Send + Sync {
    /// Embed a single text
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// The fixed vector dimension this gate produces
    fn dimension(&self) -> usize;
}

/// Configuration for embedding generation
#[derive(Debug, Clone)]
pub struct EmbeddingConfig {
    pub provider: EmbeddingProvider,
    pub model: String,
    pub dimension: usize,
    pub endpoint: String,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

impl EmbeddingConfig {
    /// Build from application config.
    ///
    /// # Errors
    /// `Config` when the provider string is unknown.
    pub fn from_app_config(config: &crate::config::AppConfig) -> Result<Self> {
        let provider = match config.embeddings.provider.as_str() {
            "openai" => EmbeddingProvider::OpenAI,
            "ollama" => EmbeddingProvider::Ollama,
            other => {
                return Err(crate::VedaRagError::Config(format!(
                    "Unknown embedding provider: {other} (expected \"openai\" or \"ollama\")"
                )))
            }
        };

        Ok(Self {
            provider,
            model: config.embedding_model().to_string(),
            dimension: config.embedding_dimension(),
            endpoint: config.embedding_endpoint().to_string(),
            api_key: config.embeddings.api_key.clone(),
            timeout_secs: config.embedding_timeout_secs(),
        })
    }
}
