// REST message processing: parse the target, then forward to the server proxy

use crate::core::fault::{CodedFault, X_INVALID_CLIENT_IDENTIFIER, X_INVALID_REQUEST, X_NETWORK_ERROR};
use crate::core::models::ClientId;
use crate::core::resilience::{create_circuit_breaker, execute_with_cb, UpstreamCircuitBreaker};
use crate::proxy::op_monitoring::OpMonitoringData;
use async_trait::async_trait;
use axum::body::{Body, Bytes};
use axum::extract::Request;
use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::Response;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};
use uuid::Uuid;

pub const X_ROAD_CLIENT_HEADER: &str = "X-Road-Client";
pub const X_ROAD_ID_HEADER: &str = "X-Road-Id";

const HOP_BY_HOP_HEADERS: [&str; 10] = [
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailers",
    "transfer-encoding",
    "upgrade",
    "host",
    "content-length",
];

/// Processes one admitted request
#[async_trait]
pub trait MessageProcessor: Send {
    async fn process(self: Box<Self>, op: &mut OpMonitoringData) -> Result<Response, CodedFault>;
}

/// `/r{N}/{INSTANCE}/{CLASS}/{MEMBER}/{SUBSYSTEM}/{SERVICE}[/path]` split into its parts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestRequestTarget {
    pub provider: ClientId,
    pub service_code: String,
    pub path: String,
}

impl RestRequestTarget {
    pub fn parse(target: &str) -> Result<Self, CodedFault> {
        let invalid = || CodedFault::client(X_INVALID_REQUEST, format!("Invalid REST request target '{}'", target));

        let rest = target.strip_prefix('/').ok_or_else(invalid)?;
        let mut segments = rest.splitn(7, '/');
        let _version = segments.next().ok_or_else(invalid)?;

        let mut parts = Vec::with_capacity(5);
        for _ in 0..5 {
            match segments.next() {
                Some(segment) if !segment.is_empty() => parts.push(segment),
                _ => return Err(invalid()),
            }
        }
        let path = format!("/{}", segments.next().unwrap_or(""));

        Ok(Self {
            provider: ClientId::subsystem(parts[0], parts[1], parts[2], parts[3]),
            service_code: parts[4].to_string(),
            path,
        })
    }

    pub fn service_id(&self) -> String {
        format!("{}:{}", self.provider, self.service_code)
    }
}

/// Request handed to the server proxy
#[derive(Debug, Clone)]
pub struct ForwardRequest {
    pub method: String,
    pub target: String,
    pub headers: Vec<(String, Vec<u8>)>,
    pub body: Bytes,
    pub message_id: String,
}

#[derive(Debug, Clone)]
pub struct ForwardResponse {
    pub status: u16,
    pub headers: Vec<(String, Vec<u8>)>,
    pub body: Bytes,
}

/// Transport to the server proxy
#[async_trait]
pub trait RestForwarder: Send + Sync {
    async fn forward(&self, request: ForwardRequest) -> Result<ForwardResponse, CodedFault>;
}

/// Forwards over HTTP with a pooled client behind a circuit breaker
pub struct HttpRestForwarder {
    http_client: reqwest::Client,
    server_proxy_url: String,
    cb: UpstreamCircuitBreaker,
}

impl HttpRestForwarder {
    pub fn new(server_proxy_url: &str, timeout_secs: u64) -> Result<Self, CodedFault> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(2))
            .tcp_nodelay(true)
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .map_err(|e| CodedFault::server(X_NETWORK_ERROR, format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            server_proxy_url: server_proxy_url.trim_end_matches('/').to_string(),
            cb: create_circuit_breaker(),
        })
    }
}

#[async_trait]
impl RestForwarder for HttpRestForwarder {
    async fn forward(&self, request: ForwardRequest) -> Result<ForwardResponse, CodedFault> {
        let url = format!("{}{}", self.server_proxy_url, request.target);
        let method = reqwest::Method::from_bytes(request.method.as_bytes())
            .map_err(|_| CodedFault::client(X_INVALID_REQUEST, format!("Invalid method {}", request.method)))?;

        let mut builder = self.http_client.request(method, &url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_slice());
        }
        let builder = builder
            .header(X_ROAD_ID_HEADER, request.message_id.as_str())
            .body(request.body);

        debug!(url = %url, message_id = %request.message_id, "Forwarding request to server proxy");
        let response = execute_with_cb(&self.cb, || builder.send()).await?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| (name.as_str().to_string(), value.as_bytes().to_vec()))
            .collect();
        let body = response.bytes().await.map_err(|e| {
            CodedFault::server(X_NETWORK_ERROR, format!("Failed to read server proxy response: {}", e))
        })?;

        Ok(ForwardResponse { status, headers, body })
    }
}

fn forwardable(name: &str) -> bool {
    !HOP_BY_HOP_HEADERS.contains(&name.to_ascii_lowercase().as_str())
}

fn parse_client_header(headers: &HeaderMap) -> Result<ClientId, CodedFault> {
    let raw = headers
        .get(X_ROAD_CLIENT_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| CodedFault::client(X_INVALID_CLIENT_IDENTIFIER, "Missing X-Road-Client header"))?;
    ClientId::parse_with(raw.trim(), '/').map_err(|e| CodedFault::client(X_INVALID_CLIENT_IDENTIFIER, e))
}

/// Processor for requests of the REST protocol family
pub struct ClientRestMessageProcessor {
    target: String,
    request: Request,
    forwarder: Arc<dyn RestForwarder>,
    max_body_bytes: usize,
}

impl ClientRestMessageProcessor {
    pub fn new(target: &str, request: Request, forwarder: Arc<dyn RestForwarder>, max_body_bytes: usize) -> Self {
        Self {
            target: target.to_string(),
            request,
            forwarder,
            max_body_bytes,
        }
    }
}

#[async_trait]
impl MessageProcessor for ClientRestMessageProcessor {
    async fn process(self: Box<Self>, op: &mut OpMonitoringData) -> Result<Response, CodedFault> {
        let this = *self;
        let target = RestRequestTarget::parse(&this.target)?;
        op.service_id = Some(target.service_id());
        op.rest_path = Some(target.path.clone());

        let (parts, body) = this.request.into_parts();
        let client_id = parse_client_header(&parts.headers)?;
        op.client_id = Some(client_id.to_string());

        let message_id = Uuid::new_v4().to_string();
        op.message_id = Some(message_id.clone());

        let body = axum::body::to_bytes(body, this.max_body_bytes)
            .await
            .map_err(|e| CodedFault::client(X_INVALID_REQUEST, format!("Failed to read request body: {}", e)))?;

        let headers = parts
            .headers
            .iter()
            .filter(|(name, _)| forwardable(name.as_str()))
            .map(|(name, value)| (name.as_str().to_string(), value.as_bytes().to_vec()))
            .collect();
        let forward_target = parts
            .uri
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| this.target.clone());

        info!(
            message_id = %message_id,
            client_id = %client_id,
            service_id = %target.service_id(),
            method = %parts.method,
            "Processing REST request"
        );

        let upstream = this
            .forwarder
            .forward(ForwardRequest {
                method: parts.method.as_str().to_string(),
                target: forward_target,
                headers,
                body,
                message_id: message_id.clone(),
            })
            .await?;

        let mut response = Response::new(Body::from(upstream.body));
        *response.status_mut() = StatusCode::from_u16(upstream.status).unwrap_or(StatusCode::BAD_GATEWAY);
        let response_headers = response.headers_mut();
        for (name, value) in upstream.headers {
            if !forwardable(&name) {
                continue;
            }
            if let (Ok(name), Ok(value)) = (HeaderName::try_from(name), HeaderValue::from_bytes(&value)) {
                response_headers.append(name, value);
            }
        }
        if let Ok(value) = HeaderValue::from_str(&message_id) {
            response_headers.insert(X_ROAD_ID_HEADER, value);
        }

        Ok(response)
    }
}
