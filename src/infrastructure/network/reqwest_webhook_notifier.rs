use std::net::SocketAddr;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url, redirect};

use crate::application::ports::{WebhookError, WebhookNotifier, WebhookPayload};
use crate::domain::WebhookTarget;
use crate::infrastructure::observability::redact_url;

/// Delivers webhook payloads with reqwest.
///
/// A pinned target gets its own client whose resolver override maps the
/// hostname to the vetted address: the TCP connection goes to that IP while
/// TLS SNI and certificate checks still use the hostname. Redirects are
/// never followed and system proxies are bypassed.
pub struct ReqwestWebhookNotifier {
    timeout: Duration,
    user_agent: String,
}

impl ReqwestWebhookNotifier {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            user_agent: format!("docgate/{}", env!("CARGO_PKG_VERSION")),
        }
    }

    fn client_for(&self, target: &WebhookTarget, url: &Url) -> Result<Client, WebhookError> {
        let mut builder = Client::builder()
            .redirect(redirect::Policy::none())
            .no_proxy()
            .timeout(self.timeout)
            .user_agent(&self.user_agent);

        if let Some(ip) = target.pinned_ip {
            let port = url
                .port_or_known_default()
                .ok_or_else(|| WebhookError::InvalidUrl("missing port".to_string()))?;
            // reqwest matches overrides against the URL's literal host.
            let host = url.host_str().unwrap_or(&target.host);
            builder = builder.resolve(host, SocketAddr::new(ip, port));
        }

        builder
            .build()
            .map_err(|e| WebhookError::Client(e.to_string()))
    }
}

#[async_trait]
impl WebhookNotifier for ReqwestWebhookNotifier {
    async fn notify(
        &self,
        target: &WebhookTarget,
        payload: &WebhookPayload,
    ) -> Result<u16, WebhookError> {
        let url = Url::parse(&target.url).map_err(|e| WebhookError::InvalidUrl(e.to_string()))?;
        let client = self.client_for(target, &url)?;
        let shown = redact_url(&target.url);

        let response = client
            .post(url)
            .json(payload)
            .send()
            .await
            .map_err(|e| {
                tracing::warn!(url = %shown, job_id = %payload.job_id, "Webhook request failed");
                WebhookError::Delivery(e.without_url().to_string())
            })?;

        let status = response.status();
        if status.is_success() {
            tracing::info!(url = %shown, job_id = %payload.job_id, status = status.as_u16(), "Webhook sent");
        } else {
            tracing::warn!(url = %shown, job_id = %payload.job_id, status = status.as_u16(), "Webhook answered with an error status");
        }
        Ok(status.as_u16())
    }
}
