use std::net::IpAddr;

use async_trait::async_trait;

#[async_trait]
pub trait HostResolver: Send + Sync {
    async fn resolve(&self, host: &str, port: u16) -> Result<Vec<IpAddr>, ResolveError>;
}

#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("lookup failed for {host}: {reason}")]
    LookupFailed { host: String, reason: String },
}
