mod reqwest_webhook_notifier;
mod tokio_host_resolver;

pub use reqwest_webhook_notifier::ReqwestWebhookNotifier;
pub use tokio_host_resolver::TokioHostResolver;
