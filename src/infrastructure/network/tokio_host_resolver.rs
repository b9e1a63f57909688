use std::net::IpAddr;

use async_trait::async_trait;

use crate::application::ports::{HostResolver, ResolveError};

/// System resolver via `tokio::net::lookup_host`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioHostResolver;

#[async_trait]
impl HostResolver for TokioHostResolver {
    async fn resolve(&self, host: &str, port: u16) -> Result<Vec<IpAddr>, ResolveError> {
        let addrs = tokio::net::lookup_host((host, port))
            .await
            .map_err(|e| ResolveError::LookupFailed {
                host: host.to_string(),
                reason: e.to_string(),
            })?;

        let mut ips: Vec<IpAddr> = Vec::new();
        for addr in addrs {
            if !ips.contains(&addr.ip()) {
                ips.push(addr.ip());
            }
        }
        Ok(ips)
    }
}
