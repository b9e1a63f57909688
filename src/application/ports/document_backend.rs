use std::path::PathBuf;

use async_trait::async_trait;
use serde::Serialize;

use crate::domain::{ParserKind, TargetId};

#[derive(Debug, Clone, Serialize)]
pub struct ProcessRequest {
    pub target_id: TargetId,
    pub file_path: PathBuf,
    pub output_dir: PathBuf,
    pub parser: ParserKind,
}

#[derive(Debug, Clone, Serialize)]
pub struct QueryRequest {
    pub query: String,
    pub mode: String,
    pub context_only: bool,
}

/// The external document-intelligence engine: parsing, embedding, graph
/// storage and querying all happen behind this seam.
#[async_trait]
pub trait DocumentBackend: Send + Sync {
    /// Parses and indexes one document, writing artifacts into
    /// `request.output_dir`. May run for hours on CPU-only hosts.
    async fn process(&self, request: &ProcessRequest) -> Result<(), BackendError>;

    async fn query(&self, request: &QueryRequest) -> Result<serde_json::Value, BackendError>;

    /// Give the engine a chance to load its knowledge base before traffic
    /// arrives. Failure is not fatal; the first job retries implicitly.
    async fn warm_up(&self) -> Result<(), BackendError> {
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("engine unavailable: {0}")]
    Unavailable(String),
    #[error("processing failed: {0}")]
    ProcessingFailed(String),
    #[error("query failed: {0}")]
    QueryFailed(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
