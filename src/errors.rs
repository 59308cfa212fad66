use thiserror::Error;

#[derive(Error, Debug)]
pub enum VedaRagError {
    #[error("Encoding error in document {source_id}: {detail}")]
    Encoding { source_id: String, detail: String },

    #[error("No extractable content in document: {0}")]
    NoContent(String),

    #[error("Vector dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Embedding service unavailable: {0}")]
    EmbeddingUnavailable(String),

    #[error("Embedding request timed out after {0}s")]
    EmbeddingTimeout(u64),

    #[error("Index corruption: {0}")]
    IndexCorruption(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    TomlParsing(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl VedaRagError {
    /// Whether a caller may reasonably retry the failed operation.
    ///
    /// Timeouts are transient; everything else either reflects bad input or
    /// a hard dependency failure that a blind retry would only repeat.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::EmbeddingTimeout(_))
    }

    /// Whether the error is scoped to a single document during ingestion.
    ///
    /// Per-document errors are collected into the ingestion report instead
    /// of aborting the batch.
    #[must_use]
    pub const fn is_per_document(&self) -> bool {
        matches!(self, Self::Encoding { .. } | Self::NoContent(_))
    }
}

pub type Result<T> = std::result::Result<T, VedaRagError>;
