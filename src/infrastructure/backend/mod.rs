mod http_document_backend;
mod mock_document_backend;

pub use http_document_backend::HttpDocumentBackend;
pub use mock_document_backend::MockDocumentBackend;
