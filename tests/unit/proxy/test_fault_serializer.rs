// Unit tests for fault envelopes

use axum::body::to_bytes;
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use security_server::core::fault::{CodedFault, X_NETWORK_ERROR, X_OUTDATED_GLOBALCONF};
use security_server::proxy::fault_serializer::fault_status;
use security_server::proxy::{send_error_response, FaultSerializer, X_ROAD_ERROR_HEADER};

#[test]
fn test_serializer_from_headers() {
    let mut headers = HeaderMap::new();
    assert_eq!(FaultSerializer::from_headers(&headers), FaultSerializer::Json);

    headers.insert(header::ACCEPT, HeaderValue::from_static("text/html, text/xml;q=0.8"));
    assert_eq!(FaultSerializer::from_headers(&headers), FaultSerializer::Xml);
}

#[test]
fn test_json_fault_body() {
    let fault = CodedFault::server(X_NETWORK_ERROR, "connection refused").with_detail("abc-123");
    let body: serde_json::Value = serde_json::from_slice(&FaultSerializer::to_json(&fault).unwrap()).unwrap();

    assert_eq!(body["type"], "Server.ClientProxy.NetworkError");
    assert_eq!(body["message"], "connection refused");
    assert_eq!(body["detail"], "abc-123");
}

#[test]
fn test_status_from_prefix() {
    assert_eq!(
        fault_status(&CodedFault::server(X_OUTDATED_GLOBALCONF, "x")),
        StatusCode::INTERNAL_SERVER_ERROR
    );
    assert_eq!(
        fault_status(&CodedFault::new("Client.Custom.Thing", "x")),
        StatusCode::BAD_REQUEST
    );
}

#[tokio::test]
async fn test_xml_response() {
    let fault = CodedFault::server(X_OUTDATED_GLOBALCONF, "Global configuration is expired").with_detail("d1");
    let response = send_error_response(&fault, FaultSerializer::Xml).unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "application/xml; charset=utf-8"
    );
    assert_eq!(
        response.headers().get(X_ROAD_ERROR_HEADER).unwrap(),
        "Server.ClientProxy.OutdatedGlobalConf"
    );

    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let xml = String::from_utf8(body.to_vec()).unwrap();
    assert!(xml.contains("<error><type>Server.ClientProxy.OutdatedGlobalConf</type>"));
    assert!(xml.contains("<message>Global configuration is expired</message>"));
    assert!(xml.ends_with("<detail>d1</detail></error>"));
}
