use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::sync::Arc;

use reqwest::Url;

use super::RejectionKind;
use crate::application::ports::HostResolver;
use crate::domain::WebhookTarget;

pub const DEFAULT_MAX_URL_LENGTH: usize = 2048;

#[derive(Debug, Clone)]
pub struct WebhookGuardConfig {
    /// Skip resolution entirely and accept any host. Unsafe outside trusted networks.
    pub allow_private_hosts: bool,
    /// Hostnames (or parent domains) trusted without resolution.
    pub allowed_hosts: Vec<String>,
    pub max_url_length: usize,
}

impl Default for WebhookGuardConfig {
    fn default() -> Self {
        Self {
            allow_private_hosts: false,
            allowed_hosts: Vec::new(),
            max_url_length: DEFAULT_MAX_URL_LENGTH,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum WebhookGuardError {
    #[error("webhook_url too long (max {max} characters)")]
    TooLong { max: usize },
    #[error("webhook_url is not a valid URL")]
    Malformed,
    #[error("webhook_url must use http or https")]
    UnsupportedScheme,
    #[error("webhook_url must not include credentials")]
    EmbeddedCredentials,
    #[error("webhook_url must include a hostname")]
    MissingHost,
    #[error("webhook_url host could not be resolved")]
    ResolutionFailed,
    #[error("webhook_url resolves to a private or reserved address")]
    PrivateAddress,
}

impl WebhookGuardError {
    pub fn kind(&self) -> RejectionKind {
        match self {
            WebhookGuardError::ResolutionFailed | WebhookGuardError::PrivateAddress => {
                RejectionKind::PermissionDenied
            }
            _ => RejectionKind::InvalidInput,
        }
    }
}

/// SSRF filter for caller-supplied callback URLs.
///
/// The returned [`WebhookTarget`] carries the address that passed the check;
/// delivery connects to that address so a second DNS answer cannot redirect
/// the request somewhere internal.
pub struct WebhookGuard {
    config: WebhookGuardConfig,
    resolver: Arc<dyn HostResolver>,
}

impl WebhookGuard {
    pub fn new(mut config: WebhookGuardConfig, resolver: Arc<dyn HostResolver>) -> Self {
        config.allowed_hosts = config
            .allowed_hosts
            .iter()
            .map(|h| normalize_host(h.trim().trim_start_matches('.')))
            .filter(|h| !h.is_empty())
            .collect();
        Self { config, resolver }
    }

    pub fn config(&self) -> &WebhookGuardConfig {
        &self.config
    }

    pub async fn sanitize(&self, raw: &str) -> Result<WebhookTarget, WebhookGuardError> {
        let raw = raw.trim();
        if raw.len() > self.config.max_url_length {
            return Err(WebhookGuardError::TooLong {
                max: self.config.max_url_length,
            });
        }

        let mut url = Url::parse(raw).map_err(|_| WebhookGuardError::Malformed)?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(WebhookGuardError::UnsupportedScheme);
        }
        if !url.username().is_empty() || url.password().is_some() {
            return Err(WebhookGuardError::EmbeddedCredentials);
        }

        let host = url
            .host_str()
            .map(normalize_host)
            .filter(|h| !h.is_empty())
            .ok_or(WebhookGuardError::MissingHost)?;
        // The delivered URL must carry the same host the pin is keyed on.
        if url.host_str() != Some(host.as_str()) {
            url.set_host(Some(&host)).map_err(|_| WebhookGuardError::Malformed)?;
        }
        let port = url
            .port_or_known_default()
            .ok_or(WebhookGuardError::Malformed)?;

        let unpinned = || WebhookTarget {
            url: url.to_string(),
            host: host.clone(),
            pinned_ip: None,
        };

        if self.is_allow_listed(&host) {
            tracing::debug!(host = %host, "Webhook host allow-listed");
            return Ok(unpinned());
        }
        if self.config.allow_private_hosts {
            return Ok(unpinned());
        }

        let candidates = match host.trim_matches(|c| c == '[' || c == ']').parse::<IpAddr>() {
            Ok(literal) => vec![literal],
            Err(_) => self.resolver.resolve(&host, port).await.map_err(|e| {
                tracing::warn!(error = %e, host = %host, "Webhook host resolution failed");
                WebhookGuardError::ResolutionFailed
            })?,
        };

        if candidates.is_empty() {
            return Err(WebhookGuardError::ResolutionFailed);
        }

        match candidates.into_iter().find(|ip| is_public_ip(*ip)) {
            Some(ip) => Ok(WebhookTarget {
                pinned_ip: Some(ip),
                ..unpinned()
            }),
            None => {
                tracing::warn!(host = %host, "Rejected webhook resolving only to private addresses");
                Err(WebhookGuardError::PrivateAddress)
            }
        }
    }

    fn is_allow_listed(&self, host: &str) -> bool {
        self.config.allowed_hosts.iter().any(|allowed| {
            host == allowed
                || host
                    .strip_suffix(allowed.as_str())
                    .is_some_and(|rest| rest.ends_with('.'))
        })
    }
}

fn normalize_host(host: &str) -> String {
    host.trim_end_matches('.').to_ascii_lowercase()
}

/// True when the address is globally routable: not private, loopback,
/// link-local, multicast, documentation, shared or otherwise reserved.
pub fn is_public_ip(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => is_public_v4(v4),
        IpAddr::V6(v6) => is_public_v6(v6),
    }
}

fn is_public_v4(ip: Ipv4Addr) -> bool {
    let [a, b, c, _] = ip.octets();
    let reserved = a == 0
        || ip.is_loopback()
        || ip.is_private()
        || ip.is_link_local()
        || ip.is_multicast()
        || ip.is_broadcast()
        || ip.is_documentation()
        || (a == 100 && (64..128).contains(&b))
        || (a == 192 && b == 0 && c == 0)
        || (a == 198 && (b == 18 || b == 19))
        || a >= 240;
    !reserved
}

fn is_public_v6(ip: Ipv6Addr) -> bool {
    if let Some(mapped) = ip.to_ipv4_mapped() {
        return is_public_v4(mapped);
    }

    let segments = ip.segments();
    // NAT64 well-known prefix embeds an IPv4 address in the low 32 bits.
    if segments[..6] == [0x64, 0xff9b, 0, 0, 0, 0] {
        return is_public_v4(embedded_v4(segments[6], segments[7]));
    }
    // 6to4 carries the relay's IPv4 address right after the prefix.
    if segments[0] == 0x2002 {
        return is_public_v4(embedded_v4(segments[1], segments[2]));
    }

    let reserved = ip.is_unspecified()
        || ip.is_loopback()
        || ip.is_multicast()
        // deprecated IPv4-compatible ::/96
        || segments[..6] == [0; 6]
        // local-use NAT64 64:ff9b:1::/48
        || segments[..3] == [0x64, 0xff9b, 1]
        // discard-only 100::/64
        || segments[..4] == [0x100, 0, 0, 0]
        || (segments[0] & 0xfe00) == 0xfc00
        || (segments[0] & 0xffc0) == 0xfe80
        || (segments[0] & 0xffc0) == 0xfec0
        || (segments[0] == 0x2001 && segments[1] == 0x0db8);
    !reserved
}

fn embedded_v4(high: u16, low: u16) -> Ipv4Addr {
    let [a, b] = high.to_be_bytes();
    let [c, d] = low.to_be_bytes();
    Ipv4Addr::new(a, b, c, d)
}
