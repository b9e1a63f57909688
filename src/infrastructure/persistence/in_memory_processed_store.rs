use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::stats_of;
use crate::application::ports::{ProcessedStore, StoreError, StoreStats};
use crate::domain::{ContentHash, ProcessedRecord};

/// Non-persistent store for scaffold mode and tests.
#[derive(Default)]
pub struct InMemoryProcessedStore {
    records: RwLock<HashMap<ContentHash, ProcessedRecord>>,
}

impl InMemoryProcessedStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProcessedStore for InMemoryProcessedStore {
    async fn find(&self, hash: &ContentHash) -> Result<Option<ProcessedRecord>, StoreError> {
        Ok(self.records.read().await.get(hash).cloned())
    }

    async fn mark_processed(
        &self,
        hash: &ContentHash,
        record: ProcessedRecord,
    ) -> Result<(), StoreError> {
        self.records.write().await.insert(hash.clone(), record);
        Ok(())
    }

    async fn stats(&self) -> Result<StoreStats, StoreError> {
        Ok(stats_of(self.records.read().await.values()))
    }
}
