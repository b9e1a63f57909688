use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};

use crate::application::ports::{BackendError, DocumentBackend, ProcessRequest, QueryRequest};

const HEALTH_TIMEOUT: Duration = Duration::from_secs(10);
const MAX_ERROR_BODY: usize = 500;

/// Talks to the document-intelligence engine over HTTP.
///
/// `process` has no client-side timeout of its own; the job queue bounds
/// each attempt.
pub struct HttpDocumentBackend {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    query_timeout: Duration,
}

impl HttpDocumentBackend {
    pub fn new(
        base_url: &str,
        api_key: Option<String>,
        query_timeout: Duration,
    ) -> Result<Self, BackendError> {
        let client = Client::builder()
            .build()
            .map_err(|e| BackendError::Unavailable(format!("client setup: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.filter(|k| !k.is_empty()),
            query_timeout,
        })
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => builder.bearer_auth(key),
            None => builder,
        }
    }
}

async fn error_detail(response: reqwest::Response) -> String {
    let status = response.status();
    let mut body = response.text().await.unwrap_or_default();
    if body.len() > MAX_ERROR_BODY {
        let mut cut = MAX_ERROR_BODY;
        while !body.is_char_boundary(cut) {
            cut -= 1;
        }
        body.truncate(cut);
    }
    format!("engine returned {status}: {body}")
}

#[async_trait]
impl DocumentBackend for HttpDocumentBackend {
    #[tracing::instrument(skip(self, request), fields(target_id = %request.target_id, parser = %request.parser))]
    async fn process(&self, request: &ProcessRequest) -> Result<(), BackendError> {
        let url = format!("{}/process", self.base_url);
        let response = self
            .authorized(self.client.post(&url))
            .json(request)
            .send()
            .await
            .map_err(|e| BackendError::Unavailable(e.without_url().to_string()))?;

        if !response.status().is_success() {
            return Err(BackendError::ProcessingFailed(error_detail(response).await));
        }

        tracing::debug!("Engine accepted document");
        Ok(())
    }

    async fn query(&self, request: &QueryRequest) -> Result<serde_json::Value, BackendError> {
        let url = format!("{}/query", self.base_url);
        let response = self
            .authorized(self.client.post(&url))
            .timeout(self.query_timeout)
            .json(request)
            .send()
            .await
            .map_err(|e| BackendError::QueryFailed(e.without_url().to_string()))?;

        if !response.status().is_success() {
            return Err(BackendError::QueryFailed(error_detail(response).await));
        }

        response
            .json()
            .await
            .map_err(|e| BackendError::QueryFailed(format!("invalid engine response: {e}")))
    }

    async fn warm_up(&self) -> Result<(), BackendError> {
        let url = format!("{}/health", self.base_url);
        let response = self
            .authorized(self.client.get(&url))
            .timeout(HEALTH_TIMEOUT)
            .send()
            .await
            .map_err(|e| BackendError::Unavailable(e.without_url().to_string()))?;

        match response.status() {
            StatusCode::OK => Ok(()),
            status => Err(BackendError::Unavailable(format!(
                "engine health returned {status}"
            ))),
        }
    }
}
