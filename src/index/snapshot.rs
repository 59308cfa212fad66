//! Index snapshot: the stable on-disk export/import format
//!
//! A snapshot is the migration boundary between vector-store backends; any
//! backend that can round-trip it is interchangeable with any other.

use std::path::Path;

use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;
use tracing::info;

use super::VectorIndex;
use crate::errors::Result;
use crate::errors::VedaRagError;
use crate::models::VectorRecord;

/// Current snapshot format version
pub const SNAPSHOT_VERSION: u32 = 1;

/// Serializable full dump of a vector index
#[derive(Debug, Serialize, Deserialize)]
pub struct IndexSnapshot {
    pub version: u32,
    pub dimension: usize,
    pub created_at: DateTime<Utc>,
    pub records: Vec<VectorRecord>,
}

impl IndexSnapshot {
    /// Capture the current contents of an index
    pub async fn capture(index: &dyn VectorIndex) -> Result<Self> {
        Ok(Self {
            version: SNAPSHOT_VERSION,
            dimension: index.dimension(),
            created_at: Utc::now(),
            records: index.export().await?,
        })
    }

    /// Restore into an index, validating dimensional agreement first.
    ///
    /// # Errors
    /// - `IndexCorruption` when the snapshot dimension disagrees with the
    ///   target index or a record fails the import invariants
    pub async fn restore(self, index: &dyn VectorIndex) -> Result<usize> {
        if self.version != SNAPSHOT_VERSION {
            return Err(VedaRagError::IndexCorruption(format!(
                "unsupported snapshot version {} (expected {SNAPSHOT_VERSION})",
                self.version
            )));
        }
        if self.dimension != index.dimension() {
            return Err(VedaRagError::IndexCorruption(format!(
                "snapshot dimension {} does not match index dimension {}",
                self.dimension,
                index.dimension()
            )));
        }
        index.import(self.records).await
    }

    /// Write the snapshot as pretty-printed JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(&path, json)?;
        info!(
            "Saved index snapshot: {} records to {}",
            self.records.len(),
            path.as_ref().display()
        );
        Ok(())
    }

    /// Load a snapshot from disk
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        let snapshot: Self = serde_json::from_str(&content)?;
        info!(
            "Loaded index snapshot: {} records from {}",
            snapshot.records.len(),
            path.as_ref().display()
        );
        Ok(snapshot)
    }

    /// Number of records in the snapshot
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the snapshot holds no records
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
