// Integration tests for the client proxy against a mock server proxy

use crate::common::{expired_global_conf, key_conf_with_chain, valid_global_conf};
use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use security_server::api::create_proxy_router;
use security_server::config::Config;
use security_server::metrics::Metrics;
use security_server::proxy::precondition::AuthPrecondition;
use security_server::proxy::{ClientProxy, ClientProxyHandler, ClientRestMessageHandler, HttpRestForwarder};
use security_server::state::global_conf::FileGlobalConf;
use std::sync::Arc;
use tower::ServiceExt;

fn proxy_router(server_proxy_url: &str, global_conf: FileGlobalConf) -> Router {
    let mut config = Config::test_config();
    config.server_proxy_url = server_proxy_url.to_string();
    config.proxy_timeout_secs = 5;

    let forwarder = Arc::new(HttpRestForwarder::new(&config.server_proxy_url, config.proxy_timeout_secs).unwrap());
    let handler: Arc<dyn ClientProxyHandler> = Arc::new(ClientRestMessageHandler::new(
        AuthPrecondition::new(Arc::new(global_conf), Arc::new(key_conf_with_chain()), config.ssl_enabled),
        forwarder,
        config.body_size_limit_bytes,
        Arc::new(Metrics::new().unwrap()),
    ));
    create_proxy_router(Arc::new(ClientProxy::new(vec![handler])), &config)
}

fn rest_request(path: &str) -> axum::http::request::Builder {
    Request::builder()
        .uri(path)
        .header("X-Road-Client", "FI/GOV/M2/CLIENT")
}

#[tokio::test]
async fn test_forwards_to_server_proxy() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/r1/FI/GOV/M1/SS1/rest-servicecode/pets")
        .match_query(mockito::Matcher::UrlEncoded("limit".into(), "5".into()))
        .match_header("X-Road-Client", "FI/GOV/M2/CLIENT")
        .match_header("X-Road-Id", mockito::Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"pets":["rex"]}"#)
        .create_async()
        .await;

    let router = proxy_router(&server.url(), valid_global_conf());
    let response = router
        .oneshot(
            rest_request("/r1/FI/GOV/M1/SS1/rest-servicecode/pets?limit=5")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().get("X-Road-Id").is_some());
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&body[..], br#"{"pets":["rex"]}"#);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_upstream_error_status_is_passed_through() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/r1/FI/GOV/M1/SS1/rest-servicecode/pets")
        .with_status(422)
        .with_body("unprocessable")
        .create_async()
        .await;

    let router = proxy_router(&server.url(), valid_global_conf());
    let response = router
        .oneshot(
            rest_request("/r1/FI/GOV/M1/SS1/rest-servicecode/pets")
                .method("POST")
                .body(Body::from("{}"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert!(response.headers().get("X-Road-Error").is_none());
}

#[tokio::test]
async fn test_unreachable_server_proxy() {
    // Nothing listens on port 1
    let router = proxy_router("http://127.0.0.1:1", valid_global_conf());
    let response = router
        .oneshot(
            rest_request("/r1/FI/GOV/M1/SS1/rest-servicecode/pets")
                .header(header::ACCEPT, "application/json")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        response.headers().get("X-Road-Error").unwrap(),
        "Server.ClientProxy.NetworkError"
    );
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let fault: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(fault["type"], "Server.ClientProxy.NetworkError");
}

#[tokio::test]
async fn test_outdated_global_conf_as_xml() {
    let router = proxy_router("http://127.0.0.1:1", expired_global_conf());
    let response = router
        .oneshot(
            rest_request("/r1/FI/GOV/M1/SS1/rest-servicecode/pets")
                .header(header::ACCEPT, "text/xml")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "application/xml; charset=utf-8"
    );
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let xml = String::from_utf8(body.to_vec()).unwrap();
    assert!(xml.contains("<type>Server.ClientProxy.OutdatedGlobalConf</type>"));
}

#[tokio::test]
async fn test_malformed_target_is_client_fault() {
    let router = proxy_router("http://127.0.0.1:1", valid_global_conf());
    let response = router
        .oneshot(rest_request("/r1/FI/GOV").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        response.headers().get("X-Road-Error").unwrap(),
        "Client.ClientProxy.InvalidRequest"
    );
}

#[tokio::test]
async fn test_non_rest_paths_are_not_found() {
    let router = proxy_router("http://127.0.0.1:1", expired_global_conf());
    let response = router
        .oneshot(rest_request("/soap/endpoint").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
