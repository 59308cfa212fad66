//! Document ingestion pipeline
//!
//! Raw document → normalize → detect structure → chunk → embed → index.
//! Per-document failures (bad encoding, no content) are collected into the
//! batch report instead of aborting the job; index-level failures abort the
//! operation that triggered them. Embedding is the only suspension point:
//! calls are bounded by a concurrency limit, carry the gate's timeout, and
//! honor cancellation — a cancelled embedding never produces a partial
//! insert, because each chunk is inserted only after its vector resolves.
//!
//! # Examples
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//! use vedarag::config::AppConfig;
//! use vedarag::embeddings::EmbeddingService;
//! use vedarag::index::InMemoryVectorIndex;
//! use vedarag::ingest::{DocumentLoader, IngestionPipeline};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AppConfig::load()?;
//!     let gate = Arc::new(EmbeddingService::new(&config)?);
//!     let index = Arc::new(InMemoryVectorIndex::new(config.embedding_dimension()));
//!     let pipeline = IngestionPipeline::new(&config, gate, index);
//!
//!     let loader = DocumentLoader::new(&config);
//!     let document = loader.load_plain_text("gita.txt", "bhagavad-gita", "vedanta")?;
//!     let report = pipeline
//!         .ingest_batch(vec![document], &CancellationToken::new())
//!         .await;
//!     println!("{}", report.summary());
//!     Ok(())
//! }
//! ```

pub mod chunker;
pub mod normalizer;
pub mod structure;
pub mod vocabulary;

pub use chunker::Chunker;
pub use normalizer::normalize;
pub use structure::StructureDetector;
pub use vocabulary::VocabularyLexicon;

use std::path::Path;
use std::sync::Arc;

use futures::stream::StreamExt;
use futures::stream::{
    self,
};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::config::AppConfig;
use crate::embeddings::EmbeddingGate;
use crate::errors::Result;
use crate::errors::VedaRagError;
use crate::index::VectorIndex;
use crate::models::content_fingerprint;
use crate::models::Document;
use crate::models::EmbeddedChunk;

/// Loader for the supported ingestion input formats
pub struct DocumentLoader {
    default_language: String,
}

/// One record of a line-delimited JSON corpus
#[derive(Debug, Deserialize)]
struct JsonlRecord {
    content: String,
    #[serde(default)]
    source: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    author: Option<String>,
    #[serde(default)]
    language: Option<String>,
    #[serde(default)]
    tradition: Option<String>,
    #[serde(default)]
    personality: Option<String>,
}

impl DocumentLoader {
    #[must_use]
    pub fn new(config: &AppConfig) -> Self {
        Self {
            default_language: config.ingestion.default_language.clone(),
        }
    }

    /// Load a plain-text file as a single document.
    ///
    /// # Errors
    /// - `Encoding` on malformed bytes
    /// - `Io` when the file cannot be read
    pub fn load_plain_text<P: AsRef<Path>>(
        &self,
        path: P,
        source_name: &str,
        tradition: &str,
    ) -> Result<Document> {
        let bytes = std::fs::read(&path)?;
        Document::from_bytes(source_name, &bytes, &self.default_language, tradition)
    }

    /// Load a line-delimited JSON file: one document per record with a
    /// `content` field and optional provenance fields.
    pub fn load_jsonl<P: AsRef<Path>>(
        &self,
        path: P,
        fallback_source: &str,
        fallback_tradition: &str,
    ) -> Result<Vec<Document>> {
        let bytes = std::fs::read(&path)?;
        let content =
            std::str::from_utf8(&bytes).map_err(|e| VedaRagError::Encoding {
                source_id: fallback_source.to_string(),
                detail: e.to_string(),
            })?;

        let mut documents = Vec::new();
        for (line_no, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let record: JsonlRecord = serde_json::from_str(line).map_err(|e| {
                VedaRagError::Config(format!(
                    "Malformed JSONL record at line {}: {e}",
                    line_no + 1
                ))
            })?;

            let mut document = Document::new(
                record.source.unwrap_or_else(|| fallback_source.to_string()),
                record.content,
                record
                    .language
                    .unwrap_or_else(|| self.default_language.clone()),
                record
                    .tradition
                    .unwrap_or_else(|| fallback_tradition.to_string()),
            );
            if let Some(title) = record.title {
                document = document.with_title(title);
            }
            if let Some(author) = record.author {
                document = document.with_author(author);
            }
            if let Some(personality) = record.personality {
                document = document.with_personality(personality);
            }
            documents.push(document);
        }

        debug!(
            "Loaded {} JSONL records from {}",
            documents.len(),
            path.as_ref().display()
        );
        Ok(documents)
    }
}

/// Outcome of ingesting a single document
#[derive(Debug, Clone)]
pub struct DocumentIngestion {
    pub document_id: uuid::Uuid,
    pub source_name: String,
    pub chunks_inserted: usize,
    pub markers_detected: usize,
}

/// A document that failed ingestion, with its error
#[derive(Debug)]
pub struct DocumentFailure {
    pub source_name: String,
    pub error: VedaRagError,
}

/// Batch ingestion report: partial success is the normal case
#[derive(Debug, Default)]
pub struct IngestionReport {
    pub succeeded: Vec<DocumentIngestion>,
    pub failed: Vec<DocumentFailure>,
    pub cancelled: bool,
}

impl IngestionReport {
    #[must_use]
    pub fn total_chunks(&self) -> usize {
        self.succeeded.iter().map(|d| d.chunks_inserted).sum()
    }

    #[must_use]
    pub fn is_complete_success(&self) -> bool {
        self.failed.is_empty() && !self.cancelled
    }

    /// One-line summary for CLI output
    #[must_use]
    pub fn summary(&self) -> String {
        let mut parts = vec![format!(
            "{} document(s) ingested, {} chunk(s) indexed",
            self.succeeded.len(),
            self.total_chunks()
        )];
        if !self.failed.is_empty() {
            parts.push(format!("{} document(s) failed", self.failed.len()));
        }
        if self.cancelled {
            parts.push("cancelled before completion".to_string());
        }
        parts.join("; ")
    }
}

/// End-to-end ingestion pipeline over an embedding gate and a vector index
pub struct IngestionPipeline {
    detector: StructureDetector,
    chunker: Chunker,
    gate: Arc<dyn EmbeddingGate>,
    index: Arc<dyn VectorIndex>,
    concurrency: usize,
}

impl IngestionPipeline {
    /// Create a pipeline with the built-in vocabulary lexicon, or the one
    /// configured under `[resources]`
    pub fn new(
        config: &AppConfig,
        gate: Arc<dyn EmbeddingGate>,
        index: Arc<dyn VectorIndex>,
    ) -> Self {
        let lexicon = match &config.resources.vocabulary_path {
            Some(path) => match VocabularyLexicon::from_file(path) {
                Ok(lexicon) => lexicon,
                Err(e) => {
                    warn!("Failed to load vocabulary from {path}: {e}; using built-in lexicon");
                    VocabularyLexicon::builtin()
                }
            },
            None => VocabularyLexicon::builtin(),
        };

        Self {
            detector: StructureDetector::new(),
            chunker: Chunker::new(config.chunking.clone(), Arc::new(lexicon)),
            gate,
            index,
            concurrency: config.embedding_concurrency().max(1),
        }
    }

    /// Create from explicit parts (tests, embedded use)
    pub fn from_parts(
        chunker: Chunker,
        gate: Arc<dyn EmbeddingGate>,
        index: Arc<dyn VectorIndex>,
        concurrency: usize,
    ) -> Self {
        Self {
            detector: StructureDetector::new(),
            chunker,
            gate,
            index,
            concurrency: concurrency.max(1),
        }
    }

    /// Ingest one document: normalize, detect structure, chunk, embed,
    /// insert. Embeddings for independent chunks are issued concurrently up
    /// to the configured limit; inserts happen in chunk order, each one only
    /// after its embedding resolved, so cancellation can never leave a
    /// half-written entry.
    pub async fn ingest_document(
        &self,
        document: Document,
        cancel: &CancellationToken,
    ) -> Result<DocumentIngestion> {
        let normalized = normalize(&document.text);
        let document = Document {
            fingerprint: content_fingerprint(&normalized),
            text: normalized,
            ..document
        };

        let markers = self.detector.detect(&document.text);
        debug!(
            "Detected {} structural markers in {}",
            markers.len(),
            document.source_name
        );

        let chunks = self.chunker.chunk(&document, &markers)?;
        let chunk_count = chunks.len();
        debug!("Chunked {} into {} chunks", document.source_name, chunk_count);

        let gate = &self.gate;
        let mut embedded = stream::iter(chunks.into_iter().map(|chunk| {
            let gate = Arc::clone(gate);
            let cancel = cancel.clone();
            async move {
                let text = chunk.text.clone();
                tokio::select! {
                    () = cancel.cancelled() => Err(VedaRagError::EmbeddingUnavailable(
                        "embedding request cancelled".to_string(),
                    )),
                    vector = gate.embed(&text) => {
                        Ok(EmbeddedChunk { chunk, vector: vector? })
                    }
                }
            }
        }))
        .buffered(self.concurrency);

        // Consume in order so index insertion order matches source order
        let mut inserted = 0usize;
        while let Some(result) = embedded.next().await {
            let embedded_chunk = result?;
            self.index.insert(embedded_chunk).await?;
            inserted += 1;
        }

        Ok(DocumentIngestion {
            document_id: document.id,
            source_name: document.source_name,
            chunks_inserted: inserted,
            markers_detected: markers.len(),
        })
    }

    /// Ingest a batch of documents. Per-document errors are collected, not
    /// fatal; the report distinguishes partial success from cancellation.
    pub async fn ingest_batch(
        &self,
        documents: Vec<Document>,
        cancel: &CancellationToken,
    ) -> IngestionReport {
        let mut report = IngestionReport::default();

        for document in documents {
            if cancel.is_cancelled() {
                report.cancelled = true;
                break;
            }

            let source_name = document.source_name.clone();
            match self.ingest_document(document, cancel).await {
                Ok(outcome) => {
                    info!(
                        "Ingested {}: {} chunks",
                        outcome.source_name, outcome.chunks_inserted
                    );
                    report.succeeded.push(outcome);
                }
                Err(error) => {
                    warn!("Failed to ingest {source_name}: {error}");
                    report.failed.push(DocumentFailure { source_name, error });
                }
            }
        }

        if cancel.is_cancelled() {
            report.cancelled = true;
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_summary() {
        let mut report = IngestionReport::default();
        report.succeeded.push(DocumentIngestion {
            document_id: uuid::Uuid::new_v4(),
            source_name: "gita".to_string(),
            chunks_inserted: 22,
            markers_detected: 49,
        });
        report.failed.push(DocumentFailure {
            source_name: "empty".to_string(),
            error: VedaRagError::NoContent("empty".to_string()),
        });

        assert!(!report.is_complete_success());
        assert_eq!(report.total_chunks(), 22);
        let summary = report.summary();
        assert!(summary.contains("22 chunk(s)"));
        assert!(summary.contains("1 document(s) failed"));
    }

    #[test]
    fn test_jsonl_loader_parses_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("corpus.jsonl");
        std::fs::write(
            &path,
            concat!(
                r#"{"content": "2.47 Your right is to action alone.", "source": "bhagavad-gita", "tradition": "vedanta", "personality": "krishna"}"#,
                "\n",
                r#"{"content": "A plain passage with defaults."}"#,
                "\n",
            ),
        )
        .unwrap();

        let loader = DocumentLoader::new(&AppConfig::default());
        let documents = loader.load_jsonl(&path, "fallback", "unspecified").unwrap();
        assert_eq!(documents.len(), 2);
        assert_eq!(documents[0].source_name, "bhagavad-gita");
        assert_eq!(documents[0].personality.as_deref(), Some("krishna"));
        assert_eq!(documents[1].source_name, "fallback");
        assert_eq!(documents[1].tradition, "unspecified");
    }

    #[test]
    fn test_jsonl_loader_rejects_malformed_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.jsonl");
        std::fs::write(&path, "{\"content\": \"ok\"}\nnot json\n").unwrap();

        let loader = DocumentLoader::new(&AppConfig::default());
        let err = loader.load_jsonl(&path, "x", "y").unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }
}
