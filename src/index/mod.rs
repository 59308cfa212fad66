//! Vector index: storage and similarity search over embedded chunks
//!
//! The [`VectorIndex`] trait is the backend-agnostic contract; the in-process
//! implementation lives in [`memory`], and [`snapshot`] provides the stable
//! export/import format that makes backends interchangeable. Nothing outside
//! this module may assume a particular backend.

pub mod memory;
pub mod snapshot;

pub use memory::InMemoryVectorIndex;
pub use snapshot::IndexSnapshot;

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::Deserialize;
use serde::Serialize;

use crate::errors::Result;
use crate::models::Chunk;
use crate::models::EmbeddedChunk;
use crate::models::Provenance;
use crate::models::VectorRecord;

/// Metadata predicate applied before ranking.
///
/// A closed record of the filterable provenance fields; all present
/// conditions must hold.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataFilter {
    /// Exact source match, e.g. "bhagavad-gita"
    pub source_name: Option<String>,
    /// Tradition must be one of these, e.g. {"vedanta", "yoga"}
    pub traditions: Option<Vec<String>>,
    /// Exact persona match, e.g. "krishna"
    pub personality: Option<String>,
    /// Exact language tag match
    pub language: Option<String>,
}

impl MetadataFilter {
    /// Whether a chunk's provenance satisfies every present condition
    #[must_use]
    pub fn matches(&self, provenance: &Provenance) -> bool {
        if let Some(source) = &self.source_name {
            if &provenance.source_name != source {
                return false;
            }
        }
        if let Some(traditions) = &self.traditions {
            if !traditions.contains(&provenance.tradition) {
                return false;
            }
        }
        if let Some(personality) = &self.personality {
            if provenance.personality.as_ref() != Some(personality) {
                return false;
            }
        }
        if let Some(language) = &self.language {
            if &provenance.language != language {
                return false;
            }
        }
        true
    }

    /// Whether no conditions are set
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.source_name.is_none()
            && self.traditions.is_none()
            && self.personality.is_none()
            && self.language.is_none()
    }

    /// Stable key fragment for query caching
    #[must_use]
    pub fn cache_key(&self) -> String {
        format!(
            "{}|{}|{}|{}",
            self.source_name.as_deref().unwrap_or(""),
            self.traditions
                .as_ref()
                .map(|t| t.join(","))
                .unwrap_or_default(),
            self.personality.as_deref().unwrap_or(""),
            self.language.as_deref().unwrap_or("")
        )
    }
}

/// A raw index hit: chunk plus cosine similarity, before citation resolution
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    pub score: f32,
}

/// Corpus composition counters for the stats surface
#[derive(Debug, Clone, Serialize)]
pub struct IndexStats {
    pub entries: usize,
    pub dimension: usize,
    pub by_source: BTreeMap<String, usize>,
    pub by_tradition: BTreeMap<String, usize>,
}

/// Backend-agnostic vector store contract.
///
/// Both the in-process index and a managed cloud store are valid
/// implementations; callers depend on this trait only.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Insert an embedded chunk, returning its entry id.
    ///
    /// Re-inserting an existing chunk id replaces the prior entry
    /// (last-write-wins, no silent duplication). Atomic per chunk.
    ///
    /// # Errors
    /// `DimensionMismatch` when the vector length disagrees with the index.
    async fn insert(&self, embedded: EmbeddedChunk) -> Result<String>;

    /// Similarity search: at most `top_k` results with cosine similarity
    /// ≥ `similarity_floor`, descending by score, ties broken by insertion
    /// order. An optional metadata predicate is applied before ranking.
    /// Searching an empty index returns an empty sequence, never an error.
    async fn search(
        &self,
        query_vector: &[f32],
        top_k: usize,
        similarity_floor: f32,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<ScoredChunk>>;

    /// Full dump in insertion order, for migration to another backend.
    /// Lossless round-trip with [`VectorIndex::import`].
    async fn export(&self) -> Result<Vec<VectorRecord>>;

    /// Bulk-load records, validating each against the index invariants.
    ///
    /// # Errors
    /// `IndexCorruption` on mismatched vector lengths or non-finite values.
    async fn import(&self, records: Vec<VectorRecord>) -> Result<usize>;

    /// Number of stored entries
    async fn len(&self) -> usize;

    /// Whether the index holds no entries
    async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// The fixed vector dimension, set once per index instance
    fn dimension(&self) -> usize;

    /// Corpus composition counters
    async fn stats(&self) -> IndexStats;
}

/// L2-normalize a vector in place; zero vectors are left untouched
/// (their dot product is 0 against everything, so they never outrank
/// a real match).
pub(crate) fn normalize_in_place(vector: &mut [f32]) {
    let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in vector.iter_mut() {
            *x /= norm;
        }
    }
}

/// Dot product of two equal-length vectors
pub(crate) fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provenance() -> Provenance {
        Provenance {
            source_name: "bhagavad-gita".to_string(),
            title: Some("Bhagavad Gita".to_string()),
            author: None,
            tradition: "vedanta".to_string(),
            language: "en".to_string(),
            personality: Some("krishna".to_string()),
        }
    }

    #[test]
    fn test_empty_filter_matches_everything() {
        let filter = MetadataFilter::default();
        assert!(filter.is_empty());
        assert!(filter.matches(&provenance()));
    }

    #[test]
    fn test_filter_by_personality() {
        let filter = MetadataFilter {
            personality: Some("krishna".to_string()),
            ..MetadataFilter::default()
        };
        assert!(filter.matches(&provenance()));

        let other = MetadataFilter {
            personality: Some("buddha".to_string()),
            ..MetadataFilter::default()
        };
        assert!(!other.matches(&provenance()));
    }

    #[test]
    fn test_filter_by_tradition_set() {
        let filter = MetadataFilter {
            traditions: Some(vec!["yoga".to_string(), "vedanta".to_string()]),
            ..MetadataFilter::default()
        };
        assert!(filter.matches(&provenance()));

        let miss = MetadataFilter {
            traditions: Some(vec!["buddhism".to_string()]),
            ..MetadataFilter::default()
        };
        assert!(!miss.matches(&provenance()));
    }

    #[test]
    fn test_normalize_unit_length() {
        let mut v = vec![3.0, 4.0];
        normalize_in_place(&mut v);
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-6);

        let mut zero = vec![0.0, 0.0];
        normalize_in_place(&mut zero);
        assert_eq!(zero, vec![0.0, 0.0]);
    }

    #[test]
    fn test_filter_cache_key_stable() {
        let filter = MetadataFilter {
            traditions: Some(vec!["yoga".to_string()]),
            personality: Some("krishna".to_string()),
            ..MetadataFilter::default()
        };
        assert_eq!(filter.cache_key(), filter.clone().cache_key());
        assert_ne!(filter.cache_key(), MetadataFilter::default().cache_key());
    }
}
