//! End-to-end pipeline tests: ingest real-shaped texts through the full
//! stack, retrieve with citations, and round-trip the index through a
//! snapshot file.

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use vedarag::config::AppConfig;
use vedarag::embeddings::EmbeddingGate;
use vedarag::index::IndexSnapshot;
use vedarag::index::InMemoryVectorIndex;
use vedarag::index::MetadataFilter;
use vedarag::index::VectorIndex;
use vedarag::ingest::IngestionPipeline;
use vedarag::models::Document;
use vedarag::rag::RagService;
use vedarag::Result;
use vedarag::VedaRagError;

const DIM: usize = 64;

/// Deterministic trigram-hash embeddings: lexical overlap approximates
/// cosine similarity well enough for pipeline tests.
struct TrigramGate {
    dimension: usize,
}

#[async_trait]
impl EmbeddingGate for TrigramGate {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let chars: Vec<char> = text.to_lowercase().chars().collect();
        let mut vector = vec![0.0f32; self.dimension];
        for window in chars.windows(3) {
            let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
            for c in window {
                hash ^= u64::from(*c as u32);
                hash = hash.wrapping_mul(0x0100_0000_01b3);
            }
            vector[(hash % self.dimension as u64) as usize] += 1.0;
        }
        let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in &mut vector {
                *x /= norm;
            }
        }
        Ok(vector)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

fn test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.embeddings.dimension = DIM;
    config.retrieval.similarity_floor = 0.0;
    config
}

fn gita_document() -> Document {
    let mut text = String::from("Chapter 2\n\n");
    for verse in 1..=24 {
        text.push_str(&format!(
            "2.{verse} The teacher speaks of dharma: act without attachment to the \
fruits of action, for the steady mind rests in yoga.\n\n"
        ));
    }
    Document::new("bhagavad-gita", text, "en", "vedanta")
        .with_title("Bhagavad Gita")
        .with_personality("krishna")
}

fn narrative_document() -> Document {
    let text = "The pilgrim walked the river road at dawn, past herons in the \
shallows and terraced fields above the ford, while woodsmoke drifted from the \
village behind him.\n\n"
        .repeat(10);
    Document::new("river-journal", text, "en", "narrative")
}

#[tokio::test]
async fn test_full_pipeline_ingest_and_query() {
    let config = test_config();
    let gate = Arc::new(TrigramGate { dimension: DIM });
    let index = Arc::new(InMemoryVectorIndex::new(DIM));

    let pipeline = IngestionPipeline::new(&config, gate.clone(), index.clone());
    let report = pipeline
        .ingest_batch(
            vec![gita_document(), narrative_document()],
            &CancellationToken::new(),
        )
        .await;

    assert!(report.is_complete_success(), "{}", report.summary());
    assert!(report.total_chunks() > 2);
    assert_eq!(index.len().await, report.total_chunks());

    let service = RagService::new(&config, gate, index);
    let response = service
        .query("act without attachment to the fruits of action")
        .await
        .unwrap();

    assert!(!response.results.is_empty());
    let top = &response.results[0];
    assert_eq!(top.chunk.provenance.source_name, "bhagavad-gita");
    assert_eq!(top.citations[0].source, "Bhagavad Gita");
    assert_eq!(top.citations[0].chapter, Some(2));
    assert!(response.context.contains("Bhagavad Gita"));
}

#[tokio::test]
async fn test_snapshot_round_trip_through_file() {
    let config = test_config();
    let gate = Arc::new(TrigramGate { dimension: DIM });
    let index = Arc::new(InMemoryVectorIndex::new(DIM));

    let pipeline = IngestionPipeline::new(&config, gate.clone(), index.clone());
    pipeline
        .ingest_batch(vec![gita_document()], &CancellationToken::new())
        .await;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("index.json");
    let snapshot = IndexSnapshot::capture(index.as_ref()).await.unwrap();
    snapshot.save(&path).unwrap();

    // A fresh index restored from the file answers queries identically
    let restored = Arc::new(InMemoryVectorIndex::new(DIM));
    IndexSnapshot::load(&path)
        .unwrap()
        .restore(restored.as_ref())
        .await
        .unwrap();
    assert_eq!(restored.len().await, index.len().await);

    let query = gate.embed("steady mind in yoga").await.unwrap();
    let original = index.search(&query, 5, 0.0, None).await.unwrap();
    let roundtrip = restored.search(&query, 5, 0.0, None).await.unwrap();
    assert_eq!(original.len(), roundtrip.len());
    for (a, b) in original.iter().zip(roundtrip.iter()) {
        assert_eq!(a.chunk.id, b.chunk.id);
        assert!((a.score - b.score).abs() < 1e-6);
    }
}

#[tokio::test]
async fn test_filtered_query_excludes_other_traditions() {
    let config = test_config();
    let gate = Arc::new(TrigramGate { dimension: DIM });
    let index = Arc::new(InMemoryVectorIndex::new(DIM));

    let pipeline = IngestionPipeline::new(&config, gate.clone(), index.clone());
    pipeline
        .ingest_batch(
            vec![gita_document(), narrative_document()],
            &CancellationToken::new(),
        )
        .await;

    let service = RagService::new(&config, gate, index);
    let filter = MetadataFilter {
        traditions: Some(vec!["vedanta".to_string()]),
        ..MetadataFilter::default()
    };
    let results = service
        .search("the river at dawn", 20, Some(&filter))
        .await
        .unwrap();

    assert!(!results.is_empty());
    for result in &results {
        assert_eq!(result.chunk.provenance.tradition, "vedanta");
    }
}

#[tokio::test]
async fn test_per_document_failures_do_not_abort_batch() {
    let config = test_config();
    let gate = Arc::new(TrigramGate { dimension: DIM });
    let index = Arc::new(InMemoryVectorIndex::new(DIM));

    let pipeline = IngestionPipeline::new(&config, gate, index.clone());
    let report = pipeline
        .ingest_batch(
            vec![
                Document::new("empty-scroll", "   ", "en", "test"),
                gita_document(),
            ],
            &CancellationToken::new(),
        )
        .await;

    assert_eq!(report.failed.len(), 1);
    assert!(matches!(
        report.failed[0].error,
        VedaRagError::NoContent(_)
    ));
    assert_eq!(report.succeeded.len(), 1);
    assert!(index.len().await > 0);
}
