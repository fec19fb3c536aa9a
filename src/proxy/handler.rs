// Client proxy handler chain and the REST admitter

use crate::core::fault::CodedFault;
use crate::metrics::Metrics;
use crate::proxy::fault_serializer::{send_error_response, FaultSerializer};
use crate::proxy::op_monitoring::OpMonitoringData;
use crate::proxy::precondition::AuthPrecondition;
use crate::proxy::processor::{ClientRestMessageProcessor, MessageProcessor, RestForwarder};
use async_trait::async_trait;
use axum::extract::Request;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use std::sync::Arc;
use tracing::{debug, error, warn};

pub const REST_PROTOCOL_VERSION: u32 = 1;

pub enum Admission {
    Accepted(Box<dyn MessageProcessor>),
    /// Not ours; the request goes back to the chain untouched
    Declined(Request),
}

pub enum HandlerOutcome {
    Handled(Response),
    Declined(Request),
}

#[async_trait]
pub trait ClientProxyHandler: Send + Sync {
    async fn handle(&self, request: Request) -> HandlerOutcome;
}

pub struct ClientRestMessageHandler {
    precondition: AuthPrecondition,
    forwarder: Arc<dyn RestForwarder>,
    max_body_bytes: usize,
    metrics: Arc<Metrics>,
}

impl ClientRestMessageHandler {
    pub fn new(
        precondition: AuthPrecondition,
        forwarder: Arc<dyn RestForwarder>,
        max_body_bytes: usize,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            precondition,
            forwarder,
            max_body_bytes,
            metrics,
        }
    }

    pub fn rest_prefix() -> String {
        format!("/r{}/", REST_PROTOCOL_VERSION)
    }

    /// Accept requests under `/r{version}/` once the precondition holds
    pub fn create_request_processor(
        &self,
        target: &str,
        request: Request,
        op: &mut OpMonitoringData,
    ) -> Result<Admission, CodedFault> {
        if !target.starts_with(&Self::rest_prefix()) {
            return Ok(Admission::Declined(request));
        }

        op.rest_path = Some(target.to_string());
        self.precondition.verify_can_process()?;

        Ok(Admission::Accepted(Box::new(ClientRestMessageProcessor::new(
            target,
            request,
            self.forwarder.clone(),
            self.max_body_bytes,
        ))))
    }
}

#[async_trait]
impl ClientProxyHandler for ClientRestMessageHandler {
    async fn handle(&self, request: Request) -> HandlerOutcome {
        let serializer = FaultSerializer::from_headers(request.headers());
        let target = request.uri().path().to_string();
        let mut op = OpMonitoringData::new();

        let result = match self.create_request_processor(&target, request, &mut op) {
            Ok(Admission::Declined(request)) => return HandlerOutcome::Declined(request),
            Ok(Admission::Accepted(processor)) => processor.process(&mut op).await,
            Err(fault) => Err(fault),
        };

        let response = match result {
            Ok(response) => {
                op.record_success();
                self.metrics.record_proxy("success");
                response
            }
            Err(fault) => {
                warn!(
                    fault_code = %fault.code,
                    detail = %fault.detail,
                    target = %target,
                    "Client proxy request failed: {}", fault.summary
                );
                op.record_fault(&fault);
                self.metrics.record_proxy("fault");
                render_fault(&fault, serializer)
            }
        };

        op.emit();
        HandlerOutcome::Handled(response)
    }
}

fn render_fault(fault: &CodedFault, serializer: FaultSerializer) -> Response {
    match send_error_response(fault, serializer) {
        Ok(response) => response,
        Err(e) => {
            error!(fault_code = %fault.code, error = %e, "Failed to serialize JSON fault");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Ordered handler chain; the first handler that takes the request answers it
pub struct ClientProxy {
    handlers: Vec<Arc<dyn ClientProxyHandler>>,
}

impl ClientProxy {
    pub fn new(handlers: Vec<Arc<dyn ClientProxyHandler>>) -> Self {
        Self { handlers }
    }

    pub async fn dispatch(&self, request: Request) -> Response {
        let mut request = request;
        for handler in &self.handlers {
            match handler.handle(request).await {
                HandlerOutcome::Handled(response) => return response,
                HandlerOutcome::Declined(returned) => request = returned,
            }
        }

        debug!(path = %request.uri().path(), "No handler accepted request");
        StatusCode::NOT_FOUND.into_response()
    }
}
