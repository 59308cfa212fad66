use std::path::Path;

use serde::Deserialize;
use serde::Serialize;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub backtrace: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingsConfig {
    /// Embedding provider: "openai" or "ollama"
    pub provider: String,
    pub model: String,
    pub dimension: usize,
    pub endpoint: String,
    #[serde(default)]
    pub api_key: Option<String>,
    /// Per-request timeout for the embedding gate
    #[serde(default = "default_embedding_timeout")]
    pub timeout_secs: u64,
}

fn default_embedding_timeout() -> u64 {
    30
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkingConfig {
    /// Preferred chunk length in characters
    #[serde(default = "default_target_chars")]
    pub target_chars: usize,
    /// Hard ceiling a chunk may grow to when respecting verse boundaries
    #[serde(default = "default_max_chars")]
    pub max_chars: usize,
    /// Chunks below this length are merged into a neighbor when possible
    #[serde(default = "default_min_chars")]
    pub min_chars: usize,
}

fn default_target_chars() -> usize {
    500
}

fn default_max_chars() -> usize {
    900
}

fn default_min_chars() -> usize {
    120
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            target_chars: default_target_chars(),
            max_chars: default_max_chars(),
            min_chars: default_min_chars(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    #[serde(default = "default_retrieval_limit")]
    pub default_limit: usize,
    /// Results scoring below this cosine similarity are dropped
    #[serde(default = "default_similarity_floor")]
    pub similarity_floor: f32,
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_secs: u64,
    #[serde(default = "default_cache_entries")]
    pub cache_max_entries: usize,
}

fn default_retrieval_limit() -> usize {
    10
}

fn default_similarity_floor() -> f32 {
    0.25
}

fn default_cache_ttl() -> u64 {
    300
}

fn default_cache_entries() -> usize {
    1000
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            default_limit: default_retrieval_limit(),
            similarity_floor: default_similarity_floor(),
            cache_ttl_secs: default_cache_ttl(),
            cache_max_entries: default_cache_entries(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestionConfig {
    /// Maximum concurrent embedding requests per document batch
    #[serde(default = "default_embedding_concurrency")]
    pub embedding_concurrency: usize,
    /// Language tag assumed when a document declares none
    #[serde(default = "default_language")]
    pub default_language: String,
}

fn default_embedding_concurrency() -> usize {
    8
}

fn default_language() -> String {
    "en".to_string()
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            embedding_concurrency: default_embedding_concurrency(),
            default_language: default_language(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Path the CLI persists the index snapshot to between invocations
    #[serde(default = "default_snapshot_path")]
    pub snapshot_path: String,
}

fn default_snapshot_path() -> String {
    "vedarag_index.json".to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            snapshot_path: default_snapshot_path(),
        }
    }
}

/// Override paths for the built-in lexicon and canonical-source tables
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResourcesConfig {
    #[serde(default)]
    pub vocabulary_path: Option<String>,
    #[serde(default)]
    pub canonical_sources_path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub logging: LoggingConfig,
    pub embeddings: EmbeddingsConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub ingestion: IngestionConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub resources: ResourcesConfig,
}

impl AppConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load configuration from default config file path
    pub fn load() -> crate::Result<Self> {
        // Try to load from config.toml first, then fall back to config.example.toml
        if Path::new("config.toml").exists() {
            Self::from_file("config.toml")
        } else if Path::new("config.example.toml").exists() {
            println!(
                "Warning: Using config.example.toml. Please create config.toml for production use."
            );
            Self::from_file("config.example.toml")
        } else {
            Err(crate::VedaRagError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "No config file found. Please create config.toml or config.example.toml",
            )))
        }
    }

    /// Get embedding dimension
    pub fn embedding_dimension(&self) -> usize {
        self.embeddings.dimension
    }

    /// Get embedding model name
    pub fn embedding_model(&self) -> &str {
        &self.embeddings.model
    }

    /// Get embedding endpoint
    pub fn embedding_endpoint(&self) -> &str {
        &self.embeddings.endpoint
    }

    /// Get embedding request timeout in seconds
    pub fn embedding_timeout_secs(&self) -> u64 {
        self.embeddings.timeout_secs
    }

    /// Get maximum concurrent embedding requests
    pub fn embedding_concurrency(&self) -> usize {
        self.ingestion.embedding_concurrency
    }

    /// Get default retrieval result cap
    pub fn retrieval_limit(&self) -> usize {
        self.retrieval.default_limit
    }

    /// Get default similarity floor
    pub fn similarity_floor(&self) -> f32 {
        self.retrieval.similarity_floor
    }

    /// Get index snapshot path
    pub fn snapshot_path(&self) -> &str {
        &self.storage.snapshot_path
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            logging: LoggingConfig {
                level: "info".to_string(),
                backtrace: true,
            },
            embeddings: EmbeddingsConfig {
                provider: "ollama".to_string(),
                model: "nomic-embed-text".to_string(),
                dimension: 384,
                endpoint: "http://localhost:11434".to_string(),
                api_key: None,
                timeout_secs: default_embedding_timeout(),
            },
            chunking: ChunkingConfig::default(),
            retrieval: RetrievalConfig::default(),
            ingestion: IngestionConfig::default(),
            storage: StorageConfig::default(),
            resources: ResourcesConfig::default(),
        }
    }
}
