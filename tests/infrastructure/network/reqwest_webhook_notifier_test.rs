use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Router;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Redirect};
use axum::routing::post;
use tokio::net::TcpListener;

use docgate::application::ports::{WebhookNotifier, WebhookPayload};
use docgate::domain::WebhookTarget;
use docgate::infrastructure::network::ReqwestWebhookNotifier;

#[derive(Clone, Default)]
struct Received {
    bodies: Arc<Mutex<Vec<(String, serde_json::Value)>>>,
}

async fn capture(
    State(received): State<Received>,
    headers: HeaderMap,
    axum::Json(body): axum::Json<serde_json::Value>,
) -> StatusCode {
    let host = headers
        .get("host")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    received.bodies.lock().unwrap().push((host, body));
    StatusCode::OK
}

async fn bounce() -> impl IntoResponse {
    Redirect::temporary("http://127.0.0.1:1/elsewhere")
}

async fn spawn_receiver() -> (SocketAddr, Received) {
    let received = Received::default();
    let app = Router::new()
        .route("/cb", post(capture))
        .route("/redirect", post(bounce))
        .with_state(received.clone());
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (addr, received)
}

fn payload() -> WebhookPayload {
    WebhookPayload::cached("2401.00001", serde_json::json!({ "indexed": true }))
}

#[tokio::test]
async fn given_pinned_target_when_notifying_then_connects_to_pinned_ip_with_original_host() {
    let (addr, received) = spawn_receiver().await;
    let notifier = ReqwestWebhookNotifier::new(Duration::from_secs(5));
    let target = WebhookTarget {
        url: format!("http://hooks.docgate.invalid:{}/cb", addr.port()),
        host: "hooks.docgate.invalid".to_string(),
        pinned_ip: Some(addr.ip()),
    };

    let status = notifier.notify(&target, &payload()).await.unwrap();

    assert_eq!(status, 200);
    let bodies = received.bodies.lock().unwrap().clone();
    assert_eq!(bodies.len(), 1);
    assert!(bodies[0].0.starts_with("hooks.docgate.invalid"));
    assert_eq!(bodies[0].1["job_id"], "cached");
    assert_eq!(bodies[0].1["status"], "completed");
    assert_eq!(bodies[0].1["target_id"], "2401.00001");
}

#[tokio::test]
async fn given_trailing_dot_url_when_notifying_then_pinned_ip_is_still_used() {
    let (addr, received) = spawn_receiver().await;
    let notifier = ReqwestWebhookNotifier::new(Duration::from_secs(5));
    let target = WebhookTarget {
        url: format!("http://hooks.docgate.invalid.:{}/cb", addr.port()),
        host: "hooks.docgate.invalid".to_string(),
        pinned_ip: Some(addr.ip()),
    };

    let status = notifier.notify(&target, &payload()).await.unwrap();

    assert_eq!(status, 200);
    assert_eq!(received.bodies.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn given_redirecting_receiver_when_notifying_then_redirect_is_not_followed() {
    let (addr, _received) = spawn_receiver().await;
    let notifier = ReqwestWebhookNotifier::new(Duration::from_secs(5));
    let target = WebhookTarget {
        url: format!("http://{addr}/redirect"),
        host: addr.ip().to_string(),
        pinned_ip: None,
    };

    let status = notifier.notify(&target, &payload()).await.unwrap();

    assert_eq!(status, 307);
}

#[tokio::test]
async fn given_unreachable_target_when_notifying_then_delivery_error() {
    let notifier = ReqwestWebhookNotifier::new(Duration::from_secs(2));
    let target = WebhookTarget {
        url: "http://127.0.0.1:1/cb".to_string(),
        host: "127.0.0.1".to_string(),
        pinned_ip: None,
    };

    assert!(notifier.notify(&target, &payload()).await.is_err());
}
