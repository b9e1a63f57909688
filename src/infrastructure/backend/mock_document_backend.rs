use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use crate::application::ports::{BackendError, DocumentBackend, ProcessRequest, QueryRequest};

/// Stand-in engine for scaffold mode: writes a small markdown file into the
/// output directory after an optional delay.
#[derive(Default)]
pub struct MockDocumentBackend {
    delay: Duration,
    process_calls: AtomicUsize,
}

impl MockDocumentBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }

    pub fn process_calls(&self) -> usize {
        self.process_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DocumentBackend for MockDocumentBackend {
    async fn process(&self, request: &ProcessRequest) -> Result<(), BackendError> {
        self.process_calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        tokio::fs::create_dir_all(&request.output_dir).await?;
        let file = request
            .output_dir
            .join(format!("{}.md", request.target_id.output_dir_name()));
        let body = format!(
            "# {}\n\nParsed with {} from {}\n",
            request.target_id,
            request.parser,
            request
                .file_path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default()
        );
        tokio::fs::write(&file, body).await?;
        Ok(())
    }

    async fn query(&self, request: &QueryRequest) -> Result<serde_json::Value, BackendError> {
        Ok(serde_json::json!({
            "response": format!("Scaffold answer for: {}", request.query),
            "mode": request.mode,
            "context_only": request.context_only,
        }))
    }
}
