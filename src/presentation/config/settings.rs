use std::path::PathBuf;
use std::time::Duration;

use config::{Config, ConfigError, File, Source};
use serde::{Deserialize, Deserializer};

use super::Environment;
use crate::domain::ParserKind;

pub const ENV_PREFIX: &str = "RAG";

const LIST_KEYS: [&str; 3] = [
    "paths.allowed_roots",
    "paths.mappings",
    "webhook.allowed_hosts",
];

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub storage: StorageSettings,
    pub processing: ProcessingSettings,
    pub rate_limit: RateLimitSettings,
    pub circuit_breaker: CircuitBreakerSettings,
    pub paths: PathSettings,
    pub webhook: WebhookSettings,
    pub auth: AuthSettings,
    pub backend: BackendSettings,
    pub scaffold: ScaffoldSettings,
}

impl Settings {
    /// Layers `appsettings.{environment}` (optional) under `RAG_*` variables,
    /// e.g. `RAG_SERVER__PORT=9000` or `RAG_PATHS__ALLOWED_ROOTS=/a,/b`.
    pub fn load(environment: Environment) -> Result<Self, ConfigError> {
        Self::from_sources(environment, env_source())
    }

    pub fn from_sources<S>(environment: Environment, overrides: S) -> Result<Self, ConfigError>
    where
        S: Source + Send + Sync + 'static,
    {
        let settings: Settings = Config::builder()
            .add_source(
                File::with_name(&format!("appsettings.{}", environment.as_str())).required(false),
            )
            .add_source(overrides)
            .build()?
            .try_deserialize()?;
        Ok(settings.normalized())
    }

    /// Drops blank list entries left over from empty or trailing-comma
    /// variables.
    fn normalized(mut self) -> Self {
        for list in [
            &mut self.paths.allowed_roots,
            &mut self.paths.mappings,
            &mut self.webhook.allowed_hosts,
        ] {
            list.retain(|entry| !entry.trim().is_empty());
            for entry in list.iter_mut() {
                *entry = entry.trim().to_string();
            }
        }
        self
    }
}

pub fn env_source() -> config::Environment {
    let mut source = config::Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
        .list_separator(",")
        .try_parsing(true);
    for key in LIST_KEYS {
        source = source.with_list_parse_key(key);
    }
    source
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub max_request_body_bytes: usize,
    /// Use the first `X-Forwarded-For` entry as the client identity.
    pub trust_proxy_headers: bool,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8767,
            max_request_body_bytes: 1024 * 1024,
            trust_proxy_headers: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    pub data_dir: PathBuf,
    pub output_base: PathBuf,
    pub storage_dir: PathBuf,
}

impl StorageSettings {
    pub fn hash_store_path(&self) -> PathBuf {
        self.storage_dir.join("processed_pdfs.json")
    }
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            output_base: PathBuf::from("data/extracted"),
            storage_dir: PathBuf::from("data/rag_knowledge_base"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProcessingSettings {
    pub timeout_secs: u64,
    pub default_parser: ParserKind,
    /// Parser retried once when the first attempt fails; "none" disables it.
    #[serde(deserialize_with = "optional_parser")]
    pub fallback_parser: Option<ParserKind>,
    pub history_limit: usize,
}

impl ProcessingSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for ProcessingSettings {
    fn default() -> Self {
        Self {
            timeout_secs: 14_400,
            default_parser: ParserKind::Mineru,
            fallback_parser: Some(ParserKind::Docling),
            history_limit: 100,
        }
    }
}

fn optional_parser<'de, D>(deserializer: D) -> Result<Option<ParserKind>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(name) if name.eq_ignore_ascii_case("none") => Ok(None),
        Some(name) => name.parse().map(Some).map_err(serde::de::Error::custom),
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RateLimitSettings {
    pub window_secs: u64,
    pub max_requests: usize,
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            window_secs: 60,
            max_requests: 120,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CircuitBreakerSettings {
    pub failure_threshold: usize,
    pub recovery_timeout_secs: u64,
}

impl Default for CircuitBreakerSettings {
    fn default() -> Self {
        Self {
            failure_threshold: 3,
            recovery_timeout_secs: 300,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PathSettings {
    pub allowed_roots: Vec<String>,
    pub allow_unsafe_paths: bool,
    pub host_path_prefix: String,
    pub container_path_prefix: String,
    /// `container_prefix:host_prefix` pairs.
    pub mappings: Vec<String>,
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            allowed_roots: Vec::new(),
            allow_unsafe_paths: false,
            host_path_prefix: String::new(),
            container_path_prefix: "/workspace/".to_string(),
            mappings: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WebhookSettings {
    pub allow_private_hosts: bool,
    pub allowed_hosts: Vec<String>,
    pub max_url_length: usize,
    pub timeout_secs: u64,
}

impl Default for WebhookSettings {
    fn default() -> Self {
        Self {
            allow_private_hosts: false,
            allowed_hosts: Vec::new(),
            max_url_length: 2048,
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AuthSettings {
    /// Shared secret. Empty or unset disables authentication.
    pub api_key: Option<String>,
}

impl AuthSettings {
    pub fn key(&self) -> Option<&str> {
        self.api_key.as_deref().filter(|k| !k.is_empty())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BackendSettings {
    pub url: String,
    pub api_key: Option<String>,
    pub query_timeout_secs: u64,
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:8768".to_string(),
            api_key: None,
            query_timeout_secs: 120,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ScaffoldSettings {
    /// Serve with the in-process mock engine and an in-memory hash store.
    pub enabled: bool,
    pub mock_delay_ms: u64,
}
