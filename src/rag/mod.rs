//! RAG (Retrieval-Augmented Generation) module
//!
//! End-to-end retrieval over the scripture corpus:
//! - Semantic retrieval using vector embeddings
//! - Metadata filtering (source, tradition, personality)
//! - Citation resolution against canonical source patterns
//! - Context assembly for the caller's language model
//!
//! The core never calls the generative model itself: it hands the caller an
//! ordered result sequence with resolved citations, and the caller decides
//! what to synthesize from it.
//!
//! # Examples
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use vedarag::config::AppConfig;
//! use vedarag::embeddings::EmbeddingService;
//! use vedarag::index::InMemoryVectorIndex;
//! use vedarag::rag::RagService;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AppConfig::load()?;
//!     let gate = Arc::new(EmbeddingService::new(&config)?);
//!     let index = Arc::new(InMemoryVectorIndex::new(config.embedding_dimension()));
//!     let service = RagService::new(&config, gate, index);
//!
//!     let response = service.query("What does Krishna teach about action?").await?;
//!     for result in &response.results {
//!         for citation in &result.citations {
//!             println!("{} (score {:.2})", citation.reference(), result.score);
//!         }
//!     }
//!     Ok(())
//! }
//! ```

pub mod citations;
pub mod context;
pub mod pipeline;
pub mod retriever;

pub use citations::CitationResolver;
pub use context::ContextAssembler;
pub use pipeline::RagQuery;
pub use pipeline::RagResponse;
pub use pipeline::RagService;
pub use retriever::CacheConfig;
pub use retriever::QueryCache;
pub use retriever::Retriever;

use serde::Serialize;

use crate::models::Chunk;
use crate::models::Citation;

/// A retrieval hit with its similarity score and resolved citations.
///
/// Transient: constructed per query, never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    pub chunk: Chunk,
    /// Cosine similarity in [-1, 1]; practically [0, 1] for text corpora
    pub score: f32,
    /// Resolved citations; empty for passages from uncatalogued sources
    pub citations: Vec<Citation>,
}
