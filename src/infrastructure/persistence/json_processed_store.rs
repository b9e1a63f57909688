use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::stats_of;
use crate::application::ports::{ProcessedStore, StoreError, StoreStats};
use crate::domain::{ContentHash, ProcessedRecord};

/// Hash store persisted as one JSON object keyed by content hash. The whole
/// file is rewritten after every insert while the in-process lock is held.
pub struct JsonProcessedStore {
    path: PathBuf,
    records: Mutex<BTreeMap<String, ProcessedRecord>>,
}

impl JsonProcessedStore {
    /// Loads the store from `path`. A missing file starts empty; so does an
    /// unreadable or corrupt one, with a warning, so a damaged store never
    /// blocks startup.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let records = load_records(&path).await;
        tracing::info!(
            path = %path.display(),
            records = records.len(),
            "Processed hash store loaded"
        );

        Ok(Self {
            path,
            records: Mutex::new(records),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

async fn load_records(path: &Path) -> BTreeMap<String, ProcessedRecord> {
    let raw = match tokio::fs::read(path).await {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return BTreeMap::new(),
        Err(e) => {
            tracing::warn!(error = %e, path = %path.display(), "Cannot read hash store, starting empty");
            return BTreeMap::new();
        }
    };

    match serde_json::from_slice(&raw) {
        Ok(records) => records,
        Err(e) => {
            tracing::warn!(error = %e, path = %path.display(), "Corrupt hash store, starting empty");
            BTreeMap::new()
        }
    }
}

#[async_trait]
impl ProcessedStore for JsonProcessedStore {
    async fn find(&self, hash: &ContentHash) -> Result<Option<ProcessedRecord>, StoreError> {
        Ok(self.records.lock().await.get(hash.as_str()).cloned())
    }

    async fn mark_processed(
        &self,
        hash: &ContentHash,
        record: ProcessedRecord,
    ) -> Result<(), StoreError> {
        let mut records = self.records.lock().await;
        records.insert(hash.as_str().to_string(), record);

        let serialized = serde_json::to_vec_pretty(&*records)?;
        let staging = self.path.with_extension("json.tmp");
        tokio::fs::write(&staging, serialized).await?;
        tokio::fs::rename(&staging, &self.path).await?;

        tracing::debug!(content_hash = %hash.short(), "Processed hash recorded");
        Ok(())
    }

    async fn stats(&self) -> Result<StoreStats, StoreError> {
        Ok(stats_of(self.records.lock().await.values()))
    }
}
