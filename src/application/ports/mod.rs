mod document_backend;
mod host_resolver;
mod processed_store;
mod webhook_notifier;

pub use document_backend::{BackendError, DocumentBackend, ProcessRequest, QueryRequest};
pub use host_resolver::{HostResolver, ResolveError};
pub use processed_store::{ProcessedStore, StoreError, StoreStats};
pub use webhook_notifier::{CACHED_JOB_ID, WebhookError, WebhookNotifier, WebhookPayload};
