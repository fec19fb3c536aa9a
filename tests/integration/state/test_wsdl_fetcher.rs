// Integration tests for WSDL download and parsing

use crate::common::testservice_url;
use security_server::core::errors::WsdlError;
use security_server::wsdl::{HttpWsdlFetcher, WsdlFetcher};
use std::time::Duration;

fn fetcher() -> HttpWsdlFetcher {
    HttpWsdlFetcher::new(Duration::from_secs(5)).unwrap()
}

fn testservice_wsdl() -> String {
    std::fs::read_to_string(concat!(env!("CARGO_MANIFEST_DIR"), "/tests/resources/testservice.wsdl")).unwrap()
}

#[tokio::test]
async fn test_fetch_from_file_url() {
    let services = fetcher().fetch(&testservice_url()).await.unwrap();

    let codes: Vec<String> = services.iter().map(|s| s.full_service_code()).collect();
    assert_eq!(codes, vec!["xroadGetRandom.v1", "bodyMassIndex.v1"]);
    assert!(services
        .iter()
        .all(|s| s.url == "http://localhost:8086/test-service" && !s.ssl_auth));
}

#[tokio::test]
async fn test_fetch_missing_file() {
    let result = fetcher().fetch("file:/nonexistent/path/service.wsdl").await;
    assert!(matches!(result, Err(WsdlError::DownloadFailed { .. })));
}

#[tokio::test]
async fn test_fetch_over_http() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/Endpoint")
        .match_query(mockito::Matcher::Exact("wsdl".into()))
        .with_status(200)
        .with_header("content-type", "text/xml")
        .with_body(testservice_wsdl())
        .create_async()
        .await;

    let url = format!("{}/Endpoint?wsdl", server.url());
    let services = fetcher().fetch(&url).await.unwrap();

    assert_eq!(services.len(), 2);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_http_error_status_is_download_failure() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/missing.wsdl")
        .with_status(404)
        .create_async()
        .await;

    let result = fetcher().fetch(&format!("{}/missing.wsdl", server.url())).await;
    match result {
        Err(WsdlError::DownloadFailed { reason, .. }) => assert!(reason.contains("404")),
        other => panic!("expected download failure, got {:?}", other),
    }
}

#[tokio::test]
async fn test_malformed_document_is_invalid_wsdl() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/broken.wsdl")
        .with_status(200)
        .with_body("<wsdl:definitions><unclosed>")
        .create_async()
        .await;

    let url = format!("{}/broken.wsdl", server.url());
    match fetcher().fetch(&url).await {
        Err(WsdlError::InvalidWsdl { url: failed, reason }) => {
            assert_eq!(failed, url);
            assert!(reason.starts_with("XML parse error"));
        }
        other => panic!("expected invalid WSDL, got {:?}", other),
    }
}
