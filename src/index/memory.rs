//! In-process vector index
//!
//! Brute-force cosine search over unit-normalized vectors. Read-mostly:
//! searches share a read lock and never block each other; inserts take the
//! write lock briefly per entry, so a search always observes a consistent
//! snapshot with respect to completed inserts.

use std::collections::BTreeMap;
use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use tracing::debug;

use super::dot;
use super::normalize_in_place;
use super::IndexStats;
use super::MetadataFilter;
use super::ScoredChunk;
use super::VectorIndex;
use crate::errors::Result;
use crate::errors::VedaRagError;
use crate::models::Chunk;
use crate::models::EmbeddedChunk;
use crate::models::VectorRecord;

struct Entry {
    chunk: Chunk,
    /// Original vector, kept for lossless export
    vector: Vec<f32>,
    /// Unit-normalized copy used for dot-product similarity
    unit: Vec<f32>,
    /// Monotonic insertion sequence; the deterministic tie-break
    seq: u64,
}

#[derive(Default)]
struct IndexInner {
    entries: Vec<Entry>,
    by_id: HashMap<String, usize>,
    next_seq: u64,
}

/// In-memory [`VectorIndex`] implementation
pub struct InMemoryVectorIndex {
    dimension: usize,
    inner: RwLock<IndexInner>,
}

impl InMemoryVectorIndex {
    /// Create an empty index with a fixed dimension
    #[must_use]
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            inner: RwLock::new(IndexInner::default()),
        }
    }

    fn check_dimension(&self, actual: usize) -> Result<()> {
        if actual != self.dimension {
            return Err(VedaRagError::DimensionMismatch {
                expected: self.dimension,
                actual,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl VectorIndex for InMemoryVectorIndex {
    async fn insert(&self, embedded: EmbeddedChunk) -> Result<String> {
        self.check_dimension(embedded.vector.len())?;

        let EmbeddedChunk { chunk, vector } = embedded;
        let mut unit = vector.clone();
        normalize_in_place(&mut unit);

        let id = chunk.id.clone();
        let mut inner = self.inner.write().expect("index lock poisoned");
        let seq = inner.next_seq;
        inner.next_seq += 1;

        let entry = Entry {
            chunk,
            vector,
            unit,
            seq,
        };

        // Last-write-wins: replacing assigns a fresh sequence number, so
        // tie-breaks reflect the order writes completed.
        if let Some(&slot) = inner.by_id.get(&id) {
            debug!("Replacing index entry {}", id);
            inner.entries[slot] = entry;
        } else {
            let slot = inner.entries.len();
            inner.by_id.insert(id.clone(), slot);
            inner.entries.push(entry);
        }

        Ok(id)
    }

    async fn search(
        &self,
        query_vector: &[f32],
        top_k: usize,
        similarity_floor: f32,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<ScoredChunk>> {
        self.check_dimension(query_vector.len())?;

        // Only the query is normalized per call; stored vectors were
        // normalized once at insertion.
        let mut query = query_vector.to_vec();
        normalize_in_place(&mut query);

        let inner = self.inner.read().expect("index lock poisoned");
        if inner.entries.is_empty() || top_k == 0 {
            return Ok(Vec::new());
        }

        let mut hits: Vec<(f32, u64, usize)> = Vec::new();
        for (slot, entry) in inner.entries.iter().enumerate() {
            if let Some(filter) = filter {
                if !filter.matches(&entry.chunk.provenance) {
                    continue;
                }
            }
            let score = dot(&query, &entry.unit);
            if score >= similarity_floor {
                hits.push((score, entry.seq, slot));
            }
        }

        hits.sort_by(|a, b| b.0.total_cmp(&a.0).then(a.1.cmp(&b.1)));
        hits.truncate(top_k);

        Ok(hits
            .into_iter()
            .map(|(score, _, slot)| ScoredChunk {
                chunk: inner.entries[slot].chunk.clone(),
                score,
            })
            .collect())
    }

    async fn export(&self) -> Result<Vec<VectorRecord>> {
        let inner = self.inner.read().expect("index lock poisoned");

        let mut ordered: Vec<&Entry> = inner.entries.iter().collect();
        ordered.sort_by_key(|e| e.seq);

        Ok(ordered
            .into_iter()
            .map(|entry| {
                VectorRecord::from(EmbeddedChunk {
                    chunk: entry.chunk.clone(),
                    vector: entry.vector.clone(),
                })
            })
            .collect())
    }

    async fn import(&self, records: Vec<VectorRecord>) -> Result<usize> {
        // Validate the whole dump before touching the index, so a corrupt
        // record cannot leave a half-imported state behind.
        for record in &records {
            if record.vector.len() != self.dimension {
                return Err(VedaRagError::IndexCorruption(format!(
                    "record {} has {}d vector, index expects {}d",
                    record.id,
                    record.vector.len(),
                    self.dimension
                )));
            }
            if record.vector.iter().any(|x| !x.is_finite()) {
                return Err(VedaRagError::IndexCorruption(format!(
                    "record {} contains non-finite vector components",
                    record.id
                )));
            }
        }

        let count = records.len();
        for record in records {
            self.insert(EmbeddedChunk::from(record)).await?;
        }

        debug!("Imported {} index records", count);
        Ok(count)
    }

    async fn len(&self) -> usize {
        self.inner.read().expect("index lock poisoned").entries.len()
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn stats(&self) -> IndexStats {
        let inner = self.inner.read().expect("index lock poisoned");
        let mut by_source: BTreeMap<String, usize> = BTreeMap::new();
        let mut by_tradition: BTreeMap<String, usize> = BTreeMap::new();

        for entry in &inner.entries {
            *by_source
                .entry(entry.chunk.provenance.source_name.clone())
                .or_default() += 1;
            *by_tradition
                .entry(entry.chunk.provenance.tradition.clone())
                .or_default() += 1;
        }

        IndexStats {
            entries: inner.entries.len(),
            dimension: self.dimension,
            by_source,
            by_tradition,
        }
    }
}
