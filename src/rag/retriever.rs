//! Retrieval: query embedding, index search, citation resolution
//!
//! The retriever guarantees semantic retrieval or an explicit failure. When
//! the embedding gate is down it surfaces `EmbeddingUnavailable` (or
//! `EmbeddingTimeout`) untouched — never a degraded text-only search and
//! never a synthesized empty result, because the caller owns the fallback
//! policy.

use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use std::time::Instant;

use dashmap::DashMap;
use tracing::debug;

use super::citations::CitationResolver;
use super::SearchResult;
use crate::embeddings::EmbeddingGate;
use crate::errors::Result;
use crate::errors::VedaRagError;
use crate::index::MetadataFilter;
use crate::index::VectorIndex;
use crate::ingest::normalize;

/// Query cache configuration
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Time a cached result set stays valid
    pub ttl: Duration,
    /// Maximum number of cached queries
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(300),
            max_entries: 1000,
        }
    }
}

impl CacheConfig {
    #[must_use]
    pub fn from_app_config(config: &crate::config::AppConfig) -> Self {
        Self {
            ttl: Duration::from_secs(config.retrieval.cache_ttl_secs),
            max_entries: config.retrieval.cache_max_entries,
        }
    }
}

/// Cache statistics
#[derive(Debug, Default)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

impl CacheStats {
    #[must_use]
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

struct CacheEntry {
    results: Vec<SearchResult>,
    expires_at: Instant,
}

impl CacheEntry {
    fn is_expired(&self) -> bool {
        Instant::now() > self.expires_at
    }
}

/// TTL + size-bounded cache of query result sets.
///
/// An explicit object handed to the retriever so lifecycle and test
/// isolation stay controllable — there is no process-global cache state.
pub struct QueryCache {
    entries: DashMap<String, CacheEntry>,
    config: CacheConfig,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl QueryCache {
    /// Create a cache with default configuration
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(CacheConfig::default())
    }

    /// Create a cache with custom configuration
    #[must_use]
    pub fn with_config(config: CacheConfig) -> Self {
        Self {
            entries: DashMap::new(),
            config,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    fn get(&self, key: &str) -> Option<Vec<SearchResult>> {
        if let Some(entry) = self.entries.get(key) {
            if !entry.is_expired() {
                self.hits.fetch_add(1, Ordering::Relaxed);
                debug!("Query cache hit");
                return Some(entry.results.clone());
            }
        }
        // Expired entries are removed on the way out
        self.entries.remove_if(key, |_, entry| entry.is_expired());
        self.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    fn put(&self, key: String, results: Vec<SearchResult>) {
        if self.entries.len() >= self.config.max_entries {
            self.evict();
        }
        self.entries.insert(
            key,
            CacheEntry {
                results,
                expires_at: Instant::now() + self.config.ttl,
            },
        );
    }

    /// Drop expired entries; if the cache is still full, shed 10%
    fn evict(&self) {
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired());

        if self.entries.len() >= self.config.max_entries {
            let shed = (self.config.max_entries / 10).max(1);
            let victims: Vec<String> = self
                .entries
                .iter()
                .take(shed)
                .map(|e| e.key().clone())
                .collect();
            for key in victims {
                self.entries.remove(&key);
            }
        }

        let removed = before.saturating_sub(self.entries.len());
        self.evictions.fetch_add(removed as u64, Ordering::Relaxed);
        debug!("Evicted {} query cache entries", removed);
    }

    /// Drop all cached result sets (e.g. after ingestion changes the corpus)
    pub fn invalidate_all(&self) {
        self.entries.clear();
    }

    /// Current statistics snapshot
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Retriever over an embedding gate and a vector index
pub struct Retriever {
    gate: Arc<dyn EmbeddingGate>,
    index: Arc<dyn VectorIndex>,
    citations: Arc<CitationResolver>,
    cache: Arc<QueryCache>,
}

impl Retriever {
    /// Create a new retriever
    pub fn new(
        gate: Arc<dyn EmbeddingGate>,
        index: Arc<dyn VectorIndex>,
        citations: Arc<CitationResolver>,
        cache: Arc<QueryCache>,
    ) -> Self {
        Self {
            gate,
            index,
            citations,
            cache,
        }
    }

    /// Retrieve ranked, cited passages for a query.
    ///
    /// The gate is called exactly once per uncached query; its failures
    /// propagate untouched so callers can apply their own retry policy.
    pub async fn retrieve(
        &self,
        query_text: &str,
        top_k: usize,
        similarity_floor: f32,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<SearchResult>> {
        let query = normalize(query_text);
        if query.is_empty() {
            return Err(VedaRagError::Config("Query text is empty".to_string()));
        }

        let cache_key = format!(
            "{query}|{top_k}|{similarity_floor:.4}|{}",
            filter.map(MetadataFilter::cache_key).unwrap_or_default()
        );
        if let Some(cached) = self.cache.get(&cache_key) {
            return Ok(cached);
        }

        debug!("Retrieving for query: {}", query);
        let query_vector = self.gate.embed(&query).await?;
        let scored = self
            .index
            .search(&query_vector, top_k, similarity_floor, filter)
            .await?;

        let results: Vec<SearchResult> = scored
            .into_iter()
            .map(|hit| SearchResult {
                citations: self.citations.resolve(
                    &hit.chunk.provenance,
                    hit.chunk.structural_range.as_ref(),
                    hit.score,
                ),
                score: hit.score,
                chunk: hit.chunk,
            })
            .collect();

        debug!("Retrieved {} results", results.len());
        self.cache.put(cache_key, results.clone());
        Ok(results)
    }

    /// The cache handed in at construction
    #[must_use]
    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result_with_score(score: f32) -> SearchResult {
        SearchResult {
            chunk: crate::models::Chunk {
                id: "x-0000".to_string(),
                document_id: uuid::Uuid::new_v4(),
                text: "text".to_string(),
                span: 0..4,
                structural_range: None,
                vocabulary: Vec::new(),
                provenance: crate::models::Provenance {
                    source_name: "test".to_string(),
                    title: None,
                    author: None,
                    tradition: "test".to_string(),
                    language: "en".to_string(),
                    personality: None,
                },
            },
            score,
            citations: Vec::new(),
        }
    }

    #[test]
    fn test_cache_hit_and_miss() {
        let cache = QueryCache::new();
        assert!(cache.get("q1").is_none());

        cache.put("q1".to_string(), vec![result_with_score(0.9)]);
        let hit = cache.get("q1").unwrap();
        assert_eq!(hit.len(), 1);

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert!((stats.hit_rate() - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_cache_ttl_expiry() {
        let cache = QueryCache::with_config(CacheConfig {
            ttl: Duration::from_millis(0),
            max_entries: 10,
        });
        cache.put("q1".to_string(), vec![result_with_score(0.9)]);
        std::thread::sleep(Duration::from_millis(5));
        assert!(cache.get("q1").is_none());
    }

    #[test]
    fn test_cache_size_bound() {
        let cache = QueryCache::with_config(CacheConfig {
            ttl: Duration::from_secs(60),
            max_entries: 10,
        });
        for i in 0..25 {
            cache.put(format!("q{i}"), vec![result_with_score(0.5)]);
        }
        assert!(cache.len() <= 11);
    }

    #[test]
    fn test_invalidate_all() {
        let cache = QueryCache::new();
        cache.put("q1".to_string(), Vec::new());
        cache.put("q2".to_string(), Vec::new());
        cache.invalidate_all();
        assert!(cache.is_empty());
    }
}
