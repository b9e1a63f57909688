mod environment;
mod settings;

pub use environment::{ENVIRONMENT_VAR, Environment};
pub use settings::{
    AuthSettings, BackendSettings, CircuitBreakerSettings, ENV_PREFIX, PathSettings,
    ProcessingSettings, RateLimitSettings, ScaffoldSettings, ServerSettings, Settings,
    StorageSettings, WebhookSettings, env_source,
};
