use std::sync::Arc;

use clap::Parser;
use clap::Subcommand;
use tokio_util::sync::CancellationToken;
use tracing::info;
use vedarag::config::AppConfig;
use vedarag::embeddings::EmbeddingService;
use vedarag::index::IndexSnapshot;
use vedarag::index::InMemoryVectorIndex;
use vedarag::index::MetadataFilter;
use vedarag::index::VectorIndex;
use vedarag::ingest::DocumentLoader;
use vedarag::ingest::IngestionPipeline;
use vedarag::rag::RagQuery;
use vedarag::rag::RagService;
use vedarag::Result;

use anyhow::Context;

#[derive(Parser)]
#[command(name = "vedarag")]
#[command(about = "VedaRAG CLI for scripture ingestion and semantic retrieval")]
#[command(version)]
struct Cli {
    /// Enable verbose debug logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest documents into the index
    Ingest {
        /// Path to the input file
        path: String,
        /// Source identifier, e.g. "bhagavad-gita"
        #[arg(short, long)]
        source: String,
        /// Tradition/category tag
        #[arg(short, long, default_value = "unspecified")]
        tradition: String,
        /// Persona this material serves
        #[arg(long)]
        personality: Option<String>,
        /// Document title
        #[arg(long)]
        title: Option<String>,
        /// Input format
        #[arg(long, value_enum, default_value = "text")]
        format: InputFormat,
    },
    /// Query the index for relevant passages
    Query {
        /// Query text
        query: String,
        /// Maximum number of results
        #[arg(short, long, default_value = "10")]
        limit: usize,
        /// Similarity floor override
        #[arg(long)]
        floor: Option<f32>,
        /// Filter by source identifier
        #[arg(long)]
        source: Option<String>,
        /// Filter by tradition (repeatable)
        #[arg(long)]
        tradition: Vec<String>,
        /// Filter by persona
        #[arg(long)]
        personality: Option<String>,
        /// Emit results as JSON
        #[arg(long)]
        json: bool,
    },
    /// Export the index snapshot to a file
    Export {
        /// Destination path
        path: String,
    },
    /// Import an index snapshot
    Import {
        /// Snapshot file to import
        path: String,
    },
    /// Show index statistics
    Stats,
    /// Show current configuration
    Config,
}

#[derive(clap::ValueEnum, Clone, Copy)]
enum InputFormat {
    /// Plain text, one document per file
    Text,
    /// Line-delimited JSON records with a content field
    Jsonl,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    if cli.verbose {
        vedarag::logging::init_logging_with_level("debug")?;
    } else {
        vedarag::logging::init_logging()?;
    }

    // Load configuration
    let config = AppConfig::load().context("failed to load configuration")?;
    info!("Configuration loaded successfully");

    match cli.command {
        Commands::Ingest {
            path,
            source,
            tradition,
            personality,
            title,
            format,
        } => {
            handle_ingest_command(
                &config,
                &path,
                &source,
                &tradition,
                personality,
                title,
                format,
            )
            .await?;
        }
        Commands::Query {
            query,
            limit,
            floor,
            source,
            tradition,
            personality,
            json,
        } => {
            handle_query_command(
                &config,
                &query,
                limit,
                floor,
                source,
                tradition,
                personality,
                json,
            )
            .await?;
        }
        Commands::Export { path } => {
            handle_export_command(&config, &path).await?;
        }
        Commands::Import { path } => {
            handle_import_command(&config, &path).await?;
        }
        Commands::Stats => {
            handle_stats_command(&config).await?;
        }
        Commands::Config => {
            handle_config_command(&config);
        }
    }

    Ok(())
}

/// Load the persisted index, or start an empty one
async fn load_index(config: &AppConfig) -> Result<Arc<InMemoryVectorIndex>> {
    let index = Arc::new(InMemoryVectorIndex::new(config.embedding_dimension()));
    let snapshot_path = config.snapshot_path();
    if std::path::Path::new(snapshot_path).exists() {
        let snapshot = IndexSnapshot::load(snapshot_path)?;
        let restored = snapshot.restore(index.as_ref()).await?;
        println!("📖 Loaded index: {restored} entries from {snapshot_path}");
    }
    Ok(index)
}

async fn save_index(config: &AppConfig, index: &InMemoryVectorIndex) -> Result<()> {
    let snapshot = IndexSnapshot::capture(index).await?;
    snapshot.save(config.snapshot_path())?;
    println!(
        "💾 Saved index: {} entries to {}",
        snapshot.len(),
        config.snapshot_path()
    );
    Ok(())
}

async fn handle_ingest_command(
    config: &AppConfig,
    path: &str,
    source: &str,
    tradition: &str,
    personality: Option<String>,
    title: Option<String>,
    format: InputFormat,
) -> Result<()> {
    println!("📚 Ingesting {path} as source \"{source}\"...");

    let gate = Arc::new(EmbeddingService::new(config)?);
    gate.validate().await?;

    let index = load_index(config).await?;
    let pipeline = IngestionPipeline::new(config, gate, index.clone());
    let loader = DocumentLoader::new(config);

    let mut documents = match format {
        InputFormat::Text => vec![loader.load_plain_text(path, source, tradition)?],
        InputFormat::Jsonl => loader.load_jsonl(path, source, tradition)?,
    };
    for document in &mut documents {
        if let Some(personality) = &personality {
            document.personality = Some(personality.clone());
        }
        if let Some(title) = &title {
            document.title = Some(title.clone());
        }
    }
    println!("  - Loaded {} document(s)", documents.len());

    // Ctrl-C cancels embedding work without leaving partial inserts
    let cancel = CancellationToken::new();
    let cancel_on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            println!("\n🛑 Cancelling ingestion...");
            cancel_on_signal.cancel();
        }
    });

    let report = pipeline.ingest_batch(documents, &cancel).await;
    println!("  - {}", report.summary());
    for failure in &report.failed {
        println!("  ❌ {}: {}", failure.source_name, failure.error);
    }

    save_index(config, &index).await?;

    if report.is_complete_success() {
        println!("✅ Ingestion completed successfully!");
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn handle_query_command(
    config: &AppConfig,
    query: &str,
    limit: usize,
    floor: Option<f32>,
    source: Option<String>,
    tradition: Vec<String>,
    personality: Option<String>,
    json: bool,
) -> Result<()> {
    let gate = Arc::new(EmbeddingService::new(config)?);
    let index = load_index(config).await?;
    if index.is_empty().await {
        println!("⚠️  Index is empty. Run `vedarag ingest` first.");
        return Ok(());
    }

    let service = RagService::new(config, gate, index);
    let filter = build_filter(source, tradition, personality);

    let response = service
        .query_with_options(RagQuery {
            question: query.to_string(),
            retrieval_limit: limit,
            similarity_floor: floor.unwrap_or_else(|| config.similarity_floor()),
            filter,
        })
        .await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&response.results)?);
        return Ok(());
    }

    println!("🔍 Query: \"{query}\"");
    println!("Found {} passage(s):", response.results.len());
    for (idx, result) in response.results.iter().enumerate() {
        println!();
        let reference = result.citations.first().map_or_else(
            || result.chunk.provenance.source_name.clone(),
            vedarag::models::Citation::reference,
        );
        println!("  {}. {} (Score: {:.3})", idx + 1, reference, result.score);
        if !result.chunk.vocabulary.is_empty() {
            println!("     Terms: {}", result.chunk.vocabulary.join(", "));
        }
        println!("     {}", truncate(&result.chunk.text, 200));
    }
    Ok(())
}

fn build_filter(
    source: Option<String>,
    tradition: Vec<String>,
    personality: Option<String>,
) -> Option<MetadataFilter> {
    let filter = MetadataFilter {
        source_name: source,
        traditions: if tradition.is_empty() {
            None
        } else {
            Some(tradition)
        },
        personality,
        language: None,
    };
    if filter.is_empty() {
        None
    } else {
        Some(filter)
    }
}

async fn handle_export_command(config: &AppConfig, path: &str) -> Result<()> {
    let index = load_index(config).await?;
    let snapshot = IndexSnapshot::capture(index.as_ref()).await?;
    snapshot.save(path)?;
    println!("📦 Exported {} entries to {path}", snapshot.len());
    Ok(())
}

async fn handle_import_command(config: &AppConfig, path: &str) -> Result<()> {
    let index = load_index(config).await?;
    let snapshot = IndexSnapshot::load(path)?;
    let imported = snapshot.restore(index.as_ref()).await?;
    println!("📥 Imported {imported} entries from {path}");
    save_index(config, &index).await?;
    Ok(())
}

async fn handle_stats_command(config: &AppConfig) -> Result<()> {
    let index = load_index(config).await?;
    let stats = index.stats().await;

    println!("📊 VedaRAG Index Statistics");
    println!("===========================");
    println!();
    println!("  Entries: {}", stats.entries);
    println!("  Dimension: {}", stats.dimension);

    if !stats.by_source.is_empty() {
        println!();
        println!("  By source:");
        for (source, count) in &stats.by_source {
            println!("    - {source}: {count}");
        }
    }
    if !stats.by_tradition.is_empty() {
        println!();
        println!("  By tradition:");
        for (tradition, count) in &stats.by_tradition {
            println!("    - {tradition}: {count}");
        }
    }
    Ok(())
}

fn handle_config_command(config: &AppConfig) {
    println!("📋 VedaRAG Configuration:");
    println!();

    println!("📝 Logging:");
    println!("  Level: {}", config.logging.level);
    println!("  Backtrace: {}", config.logging.backtrace);
    println!();

    println!("🧠 Embeddings:");
    println!("  Provider: {}", config.embeddings.provider);
    println!("  Model: {}", config.embedding_model());
    println!("  Dimension: {}", config.embedding_dimension());
    println!("  Endpoint: {}", config.embedding_endpoint());
    println!("  Timeout: {}s", config.embedding_timeout_secs());
    println!();

    println!("✂️  Chunking:");
    println!("  Target: {} chars", config.chunking.target_chars);
    println!("  Ceiling: {} chars", config.chunking.max_chars);
    println!("  Minimum: {} chars", config.chunking.min_chars);
    println!();

    println!("🔍 Retrieval:");
    println!("  Default limit: {}", config.retrieval_limit());
    println!("  Similarity floor: {}", config.similarity_floor());
    println!("  Cache TTL: {}s", config.retrieval.cache_ttl_secs);
    println!("  Cache entries: {}", config.retrieval.cache_max_entries);
    println!();

    println!("⚡ Ingestion:");
    println!("  Embedding concurrency: {}", config.embedding_concurrency());
    println!("  Default language: {}", config.ingestion.default_language);
    println!();

    println!("💾 Storage:");
    println!("  Snapshot path: {}", config.snapshot_path());
}

/// Truncate display text at a char boundary
fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.replace('\n', " ");
    }
    let shortened: String = s.chars().take(max_chars).collect();
    format!("{}...", shortened.replace('\n', " "))
}
