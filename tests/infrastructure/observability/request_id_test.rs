use axum::Router;
use axum::body::Body;
use axum::extract::Extension;
use axum::http::{Request, StatusCode};
use axum::middleware;
use axum::routing::get;
use tower::ServiceExt;

use docgate::infrastructure::observability::{
    REQUEST_ID_HEADER, RequestId, request_id_middleware,
};

fn app() -> Router {
    Router::new()
        .route(
            "/echo",
            get(|Extension(id): Extension<RequestId>| async move { id.0 }),
        )
        .layer(middleware::from_fn(request_id_middleware))
}

async fn body_text(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[test]
fn given_request_id_header_constant_when_accessed_then_returns_correct_value() {
    assert_eq!(REQUEST_ID_HEADER, "x-request-id");
}

#[tokio::test]
async fn given_no_inbound_id_when_handled_then_generates_uuid_and_echoes_it() {
    let response = app()
        .oneshot(Request::get("/echo").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let header = response.headers()[REQUEST_ID_HEADER]
        .to_str()
        .unwrap()
        .to_string();
    assert_eq!(header.len(), 36);
    assert_eq!(body_text(response).await, header);
}

#[tokio::test]
async fn given_well_formed_inbound_id_when_handled_then_reused() {
    let response = app()
        .oneshot(
            Request::get("/echo")
                .header(REQUEST_ID_HEADER, "trace-42.a_b")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.headers()[REQUEST_ID_HEADER], "trace-42.a_b");
    assert_eq!(body_text(response).await, "trace-42.a_b");
}

#[tokio::test]
async fn given_malformed_inbound_id_when_handled_then_replaced() {
    let oversized = "x".repeat(200);
    for bad in ["has space", "semi;colon", oversized.as_str()] {
        let response = app()
            .oneshot(
                Request::get("/echo")
                    .header(REQUEST_ID_HEADER, bad)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_ne!(response.headers()[REQUEST_ID_HEADER], bad);
    }
}
