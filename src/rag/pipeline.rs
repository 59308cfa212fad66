//! Complete retrieval pipeline: Retrieve -> Cite -> Assemble
//!
//! The service stops where the generative model begins: the response carries
//! ranked results, resolved citations, and an assembled context string for
//! the caller's LLM prompt. When retrieval fails upstream the caller gets a
//! typed error, never a placeholder response.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::config::AppConfig;
use crate::embeddings::EmbeddingGate;
use crate::errors::Result;
use crate::index::MetadataFilter;
use crate::index::VectorIndex;
use crate::rag::CitationResolver;
use crate::rag::ContextAssembler;
use crate::rag::QueryCache;
use crate::rag::Retriever;
use crate::rag::SearchResult;

/// Complete RAG service
pub struct RagService {
    retriever: Retriever,
    context_assembler: ContextAssembler,
    default_limit: usize,
    default_floor: f32,
}

impl RagService {
    /// Create a new RAG service over an embedding gate and a vector index
    pub fn new(
        config: &AppConfig,
        gate: Arc<dyn EmbeddingGate>,
        index: Arc<dyn VectorIndex>,
    ) -> Self {
        let citations = match &config.resources.canonical_sources_path {
            Some(path) => match CitationResolver::from_file(path) {
                Ok(resolver) => resolver,
                Err(e) => {
                    warn!(
                        "Failed to load canonical sources from {path}: {e}; using built-in table"
                    );
                    CitationResolver::builtin()
                }
            },
            None => CitationResolver::builtin(),
        };
        let cache = Arc::new(QueryCache::with_config(
            crate::rag::CacheConfig::from_app_config(config),
        ));
        let retriever = Retriever::new(gate, index, Arc::new(citations), cache);

        Self {
            retriever,
            context_assembler: ContextAssembler::default(),
            default_limit: config.retrieval_limit(),
            default_floor: config.similarity_floor(),
        }
    }

    /// Create from existing services
    #[must_use]
    pub fn from_services(
        retriever: Retriever,
        context_assembler: ContextAssembler,
        default_limit: usize,
        default_floor: f32,
    ) -> Self {
        Self {
            retriever,
            context_assembler,
            default_limit,
            default_floor,
        }
    }

    /// Perform a retrieval query with the configured defaults
    pub async fn query(&self, question: &str) -> Result<RagResponse> {
        self.query_with_options(RagQuery {
            question: question.to_string(),
            retrieval_limit: self.default_limit,
            similarity_floor: self.default_floor,
            filter: None,
        })
        .await
    }

    /// Perform a retrieval query with custom options
    pub async fn query_with_options(&self, query: RagQuery) -> Result<RagResponse> {
        info!("Processing retrieval query: {}", query.question);

        // Step 1: Retrieve relevant passages
        debug!("Step 1: Retrieving passages");
        let results = self
            .retriever
            .retrieve(
                &query.question,
                query.retrieval_limit,
                query.similarity_floor,
                query.filter.as_ref(),
            )
            .await?;

        debug!("Retrieved {} results", results.len());

        // Step 2: Assemble context for the caller's generative model
        debug!("Step 2: Assembling context");
        let (context, metadata) = self.context_assembler.assemble_with_metadata(&results);

        info!("Retrieval query completed successfully");

        Ok(RagResponse {
            results,
            context,
            metadata,
            query: query.question,
        })
    }

    /// Search without context assembly
    pub async fn search(
        &self,
        question: &str,
        limit: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<SearchResult>> {
        self.retriever
            .retrieve(question, limit, self.default_floor, filter)
            .await
    }

    /// Get retriever reference
    #[must_use]
    pub const fn retriever(&self) -> &Retriever {
        &self.retriever
    }

    /// Get context assembler reference
    #[must_use]
    pub const fn context_assembler(&self) -> &ContextAssembler {
        &self.context_assembler
    }
}

/// Retrieval query configuration
#[derive(Debug, Clone)]
pub struct RagQuery {
    pub question: String,
    pub retrieval_limit: usize,
    pub similarity_floor: f32,
    pub filter: Option<MetadataFilter>,
}

/// Retrieval response: everything the caller's generative step needs
#[derive(Debug, Clone)]
pub struct RagResponse {
    pub results: Vec<SearchResult>,
    pub context: String,
    pub metadata: Vec<HashMap<String, String>>,
    pub query: String,
}

impl RagResponse {
    /// Get a formatted string representation
    #[must_use]
    pub fn format(&self) -> String {
        let mut output = String::new();
        output.push_str(&format!("Query: {}\n\n", self.query));
        output.push_str(&format!("Sources ({} passages):\n", self.results.len()));

        for (idx, result) in self.results.iter().enumerate().take(5) {
            let reference = result.citations.first().map_or_else(
                || result.chunk.provenance.source_name.clone(),
                crate::models::Citation::reference,
            );
            output.push_str(&format!(
                "  {}. {} (Score: {:.2})\n",
                idx + 1,
                reference,
                result.score
            ));
        }

        output
    }
}
