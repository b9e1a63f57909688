mod auth;
mod client_ip;
mod rate_limit;

pub use auth::{API_KEY_HEADER, auth_middleware};
pub use client_ip::{FORWARDED_FOR_HEADER, UNKNOWN_CLIENT, client_identity, resolve_client_identity};
pub use rate_limit::rate_limit_middleware;

const MONITORING_PATHS: [&str; 2] = ["/health", "/status"];

fn is_monitoring_path(path: &str) -> bool {
    MONITORING_PATHS.contains(&path)
}
