use std::net::IpAddr;

/// A callback URL that already passed the webhook guard.
///
/// `pinned_ip` is the address the guard vetted; delivery must connect there
/// while keeping `host` for SNI and certificate checks. `None` means the host
/// was trusted without resolution (allow-listed or private mode).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookTarget {
    pub url: String,
    pub host: String,
    pub pinned_ip: Option<IpAddr>,
}
