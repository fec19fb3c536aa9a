// Integration tests for admin API authentication and authorization

use crate::common::{test_app, ADMIN_KEY, VIEWER_KEY};
use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use tower::ServiceExt;

fn get(uri: &str, api_key: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(key) = api_key {
        builder = builder.header("X-API-Key", key);
    }
    builder.body(Body::empty()).unwrap()
}

async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_missing_api_key() {
    let app = test_app();
    let response = app
        .router
        .oneshot(get("/api/v1/service-descriptions/1", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = json_body(response).await;
    assert_eq!(body["error"]["code"], "not_authenticated");
}

#[tokio::test]
async fn test_invalid_api_key() {
    let app = test_app();
    let response = app
        .router
        .oneshot(get("/api/v1/service-descriptions/1", Some("wrong-key")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_viewer_can_read() {
    let app = test_app();
    let response = app
        .router
        .oneshot(get("/api/v1/service-descriptions/1", Some(VIEWER_KEY)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_viewer_cannot_enable() {
    let app = test_app();
    let request = Request::builder()
        .method("PUT")
        .uri("/api/v1/service-descriptions/2/enable")
        .header("X-API-Key", VIEWER_KEY)
        .body(Body::empty())
        .unwrap();

    let response = app.router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = json_body(response).await;
    assert_eq!(body["error"]["code"], "access_denied");
    assert_eq!(body["error"]["metadata"][0], "ENABLE_DISABLE_WSDL");

    let still_disabled = app.store.snapshot().await;
    let sd = still_disabled.clients[0].service_description(2).unwrap();
    assert!(sd.disabled);
}

#[tokio::test]
async fn test_authorization_precedes_lookup() {
    let app = test_app();
    let request = Request::builder()
        .method("DELETE")
        .uri("/api/v1/service-descriptions/10000")
        .header("X-API-Key", VIEWER_KEY)
        .body(Body::empty())
        .unwrap();

    let response = app.router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_public_routes() {
    let app = test_app();
    let response = app.router.clone().oneshot(get("/health", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["clients"], 2);
    assert_eq!(body["global_conf_valid"], true);

    // Count one admin call, then check it shows up in the exposition
    let response = app
        .router
        .clone()
        .oneshot(get("/api/v1/clients/FI:GOV:M1:SS1", Some(ADMIN_KEY)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.router.oneshot(get("/metrics", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let text = String::from_utf8(to_bytes(response.into_body(), usize::MAX).await.unwrap().to_vec()).unwrap();
    assert!(text.contains("admin_operations_total{operation=\"get_client\",outcome=\"ok\"} 1"));
}
