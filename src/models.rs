//! Core data models: documents, structural markers, chunks, and citations

use std::ops::Range;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// A raw source document accepted for ingestion.
///
/// Immutable once created; re-ingesting a source produces a new document id
/// and a disjoint new generation of chunks rather than mutating anything in
/// place. Chunk ids are derived from the content fingerprint, so re-ingesting
/// identical text replaces the previous generation's index entries instead of
/// duplicating them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: Uuid,
    /// Source identifier as declared by the caller, e.g. "bhagavad-gita"
    pub source_name: String,
    pub text: String,
    /// BCP-47-ish language tag ("en", "sa-Latn")
    pub language: String,
    /// Tradition or category tag ("vedanta", "buddhism", "narrative")
    pub tradition: String,
    /// Persona this material serves, when the corpus is partitioned per persona
    pub personality: Option<String>,
    pub title: Option<String>,
    pub author: Option<String>,
    /// SHA-256 of the raw text, hex encoded
    pub fingerprint: String,
    pub ingested_at: DateTime<Utc>,
}

impl Document {
    /// Create a document from already-decoded text
    pub fn new(
        source_name: impl Into<String>,
        text: impl Into<String>,
        language: impl Into<String>,
        tradition: impl Into<String>,
    ) -> Self {
        let text = text.into();
        Self {
            id: Uuid::new_v4(),
            source_name: source_name.into(),
            fingerprint: content_fingerprint(&text),
            text,
            language: language.into(),
            tradition: tradition.into(),
            personality: None,
            title: None,
            author: None,
            ingested_at: Utc::now(),
        }
    }

    /// Create a document from raw bytes, failing on malformed UTF-8.
    ///
    /// # Errors
    /// `VedaRagError::Encoding` when the bytes are not valid UTF-8; the
    /// caller decides whether to re-decode with another encoding or skip
    /// the document.
    pub fn from_bytes(
        source_name: &str,
        bytes: &[u8],
        language: &str,
        tradition: &str,
    ) -> crate::Result<Self> {
        let text = std::str::from_utf8(bytes).map_err(|e| crate::VedaRagError::Encoding {
            source_id: source_name.to_string(),
            detail: e.to_string(),
        })?;
        Ok(Self::new(source_name, text, language, tradition))
    }

    #[must_use]
    pub fn with_personality(mut self, personality: impl Into<String>) -> Self {
        self.personality = Some(personality.into());
        self
    }

    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    #[must_use]
    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    /// Provenance record shared by every chunk cut from this document
    #[must_use]
    pub fn provenance(&self) -> Provenance {
        Provenance {
            source_name: self.source_name.clone(),
            title: self.title.clone(),
            author: self.author.clone(),
            tradition: self.tradition.clone(),
            language: self.language.clone(),
            personality: self.personality.clone(),
        }
    }
}

/// SHA-256 hex digest of document text
#[must_use]
pub fn content_fingerprint(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hex::encode(hasher.finalize())
}

/// Kind of structural boundary recognized in source text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MarkerKind {
    /// Chapter or section heading ("Chapter 2")
    Chapter,
    /// Numbered verse ("2.47")
    Verse,
}

/// A detected structural unit within a document.
///
/// For a verse, `span` covers the whole unit: from the verse number to the
/// start of the next marker (or the end of the document). For a chapter,
/// `span` covers the heading line only. Marker spans are atomic: the chunker
/// never cuts inside one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructureMarker {
    pub span: Range<usize>,
    pub kind: MarkerKind,
    pub chapter: Option<u32>,
    pub verse: Option<u32>,
    /// The marker text as matched, e.g. "2.47"
    pub raw: String,
}

impl StructureMarker {
    /// Whether `range` neither contains this unit nor is disjoint from it,
    /// i.e. a chunk with that range would cut through the unit.
    #[must_use]
    pub fn is_split_by(&self, range: &Range<usize>) -> bool {
        let overlaps = range.start < self.span.end && self.span.start < range.end;
        let contains = range.start <= self.span.start && self.span.end <= range.end;
        overlaps && !contains
    }
}

/// Structural coverage of a chunk, when identifiable
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuralRange {
    pub chapter_start: Option<u32>,
    pub verse_start: Option<u32>,
    pub chapter_end: Option<u32>,
    pub verse_end: Option<u32>,
}

/// Provenance metadata carried by every chunk.
///
/// A closed record rather than a string map so missing-field bugs surface at
/// compile time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provenance {
    pub source_name: String,
    pub title: Option<String>,
    pub author: Option<String>,
    pub tradition: String,
    pub language: String,
    pub personality: Option<String>,
}

/// The atomic retrieval unit: a bounded, structure-respecting span of text
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    /// Deterministic id: first 16 hex chars of the document fingerprint plus
    /// the chunk's position, e.g. "a1b2c3d4e5f60718-0042"
    pub id: String,
    pub document_id: Uuid,
    pub text: String,
    /// Character offsets into the normalized document text
    pub span: Range<usize>,
    pub structural_range: Option<StructuralRange>,
    /// Domain-vocabulary terms detected in the text
    pub vocabulary: Vec<String>,
    pub provenance: Provenance,
}

impl Chunk {
    /// Deterministic chunk id from document fingerprint and position
    #[must_use]
    pub fn derive_id(fingerprint: &str, index: usize) -> String {
        let prefix = &fingerprint[..fingerprint.len().min(16)];
        format!("{prefix}-{index:04}")
    }
}

/// A chunk paired with its embedding vector
#[derive(Debug, Clone)]
pub struct EmbeddedChunk {
    pub chunk: Chunk,
    pub vector: Vec<f32>,
}

/// A verifiable reference back to a canonical source location.
///
/// Derived deterministically from chunk provenance; never guessed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Citation {
    /// Canonical work name, e.g. "Bhagavad Gita"
    pub source: String,
    pub chapter: Option<u32>,
    pub verse_start: Option<u32>,
    pub verse_end: Option<u32>,
    /// Similarity score of the result this citation annotates
    pub relevance: f32,
}

impl Citation {
    /// Human-readable reference, e.g. "Bhagavad Gita 2.47" or
    /// "Bhagavad Gita 2.47-2.49"
    #[must_use]
    pub fn reference(&self) -> String {
        match (self.chapter, self.verse_start, self.verse_end) {
            (Some(ch), Some(v1), Some(v2)) if v1 != v2 => {
                format!("{} {ch}.{v1}-{ch}.{v2}", self.source)
            }
            (Some(ch), Some(v1), _) => format!("{} {ch}.{v1}", self.source),
            (Some(ch), None, _) => format!("{} {ch}", self.source),
            _ => self.source.clone(),
        }
    }
}

/// Stable serialization record for index export/import.
///
/// This format is the migration boundary between vector-store backends and
/// must not change shape incompatibly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorRecord {
    pub id: String,
    pub vector: Vec<f32>,
    pub text: String,
    pub document_id: Uuid,
    pub span: Range<usize>,
    pub structural_range: Option<StructuralRange>,
    pub vocabulary: Vec<String>,
    pub provenance: Provenance,
}

impl From<EmbeddedChunk> for VectorRecord {
    fn from(embedded: EmbeddedChunk) -> Self {
        let EmbeddedChunk { chunk, vector } = embedded;
        Self {
            id: chunk.id,
            vector,
            text: chunk.text,
            document_id: chunk.document_id,
            span: chunk.span,
            structural_range: chunk.structural_range,
            vocabulary: chunk.vocabulary,
            provenance: chunk.provenance,
        }
    }
}

impl From<VectorRecord> for EmbeddedChunk {
    fn from(record: VectorRecord) -> Self {
        Self {
            chunk: Chunk {
                id: record.id,
                document_id: record.document_id,
                text: record.text,
                span: record.span,
                structural_range: record.structural_range,
                vocabulary: record.vocabulary,
                provenance: record.provenance,
            },
            vector: record.vector,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_deterministic() {
        let a = content_fingerprint("dharma");
        let b = content_fingerprint("dharma");
        assert_eq!(a, b);
        assert_ne!(a, content_fingerprint("karma"));
    }

    #[test]
    fn test_derive_chunk_id() {
        let fingerprint = content_fingerprint("text");
        let id = Chunk::derive_id(&fingerprint, 3);
        assert!(id.ends_with("-0003"));
        assert_eq!(id.len(), 16 + 1 + 4);
    }

    #[test]
    fn test_marker_split_detection() {
        let marker = StructureMarker {
            span: 100..200,
            kind: MarkerKind::Verse,
            chapter: Some(2),
            verse: Some(47),
            raw: "2.47".to_string(),
        };

        // Fully contains the unit: not a split
        assert!(!marker.is_split_by(&(50..250)));
        // Fully outside: not a split
        assert!(!marker.is_split_by(&(0..100)));
        assert!(!marker.is_split_by(&(200..300)));
        // Cuts through the unit: split
        assert!(marker.is_split_by(&(50..150)));
        assert!(marker.is_split_by(&(150..250)));
        assert!(marker.is_split_by(&(120..180)));
    }

    #[test]
    fn test_citation_reference_formats() {
        let single = Citation {
            source: "Bhagavad Gita".to_string(),
            chapter: Some(2),
            verse_start: Some(47),
            verse_end: Some(47),
            relevance: 0.9,
        };
        assert_eq!(single.reference(), "Bhagavad Gita 2.47");

        let range = Citation {
            verse_end: Some(49),
            ..single.clone()
        };
        assert_eq!(range.reference(), "Bhagavad Gita 2.47-2.49");

        let chapter_only = Citation {
            verse_start: None,
            verse_end: None,
            ..single
        };
        assert_eq!(chapter_only.reference(), "Bhagavad Gita 2");
    }

    #[test]
    fn test_document_from_invalid_bytes() {
        let bad = [0xf0, 0x28, 0x8c, 0x28];
        let result = Document::from_bytes("broken", &bad, "en", "test");
        assert!(matches!(
            result,
            Err(crate::VedaRagError::Encoding { .. })
        ));
    }

    #[test]
    fn test_record_chunk_round_trip() {
        let doc = Document::new("gita", "some verse text", "en", "vedanta");
        let chunk = Chunk {
            id: Chunk::derive_id(&doc.fingerprint, 0),
            document_id: doc.id,
            text: "some verse text".to_string(),
            span: 0..15,
            structural_range: None,
            vocabulary: vec!["dharma".to_string()],
            provenance: doc.provenance(),
        };
        let embedded = EmbeddedChunk {
            chunk: chunk.clone(),
            vector: vec![0.1, 0.2, 0.3],
        };

        let record = VectorRecord::from(embedded);
        let restored = EmbeddedChunk::from(record);
        assert_eq!(restored.chunk.id, chunk.id);
        assert_eq!(restored.chunk.text, chunk.text);
        assert_eq!(restored.vector, vec![0.1, 0.2, 0.3]);
    }
}
