pub mod api_error;
pub mod config;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod state;

pub use api_error::ApiError;
pub use config::{Environment, Settings};
pub use router::create_router;
pub use state::{AppDependencies, AppState};
