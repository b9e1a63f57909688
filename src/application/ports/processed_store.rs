use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::Serialize;

use crate::domain::{ContentHash, ProcessedRecord};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    pub total_processed: usize,
    pub by_parser: BTreeMap<String, usize>,
}

/// Content-hash -> output mapping used to skip documents already processed.
#[async_trait]
pub trait ProcessedStore: Send + Sync {
    async fn find(&self, hash: &ContentHash) -> Result<Option<ProcessedRecord>, StoreError>;

    async fn mark_processed(
        &self,
        hash: &ContentHash,
        record: ProcessedRecord,
    ) -> Result<(), StoreError>;

    async fn stats(&self) -> Result<StoreStats, StoreError>;
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}
