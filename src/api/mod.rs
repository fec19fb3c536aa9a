// Axum web server layer: admin API and client proxy routers

use axum::{
    error_handling::HandleErrorLayer,
    extract::{Request, State},
    http::StatusCode,
    response::Response,
    routing::{get, post, put},
    BoxError, Router,
};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{limit::RequestBodyLimitLayer, trace::TraceLayer};

pub mod handlers;
pub mod responses;

use crate::auth::audit_logger::{AuditEvent, AuditLogger};
use crate::auth::auth_middleware::{auth_middleware, AuthState};
use crate::auth::authority::{AuthorityGate, Principal};
use crate::config::Config;
use crate::core::errors::ServerError;
use crate::metrics::Metrics;
use crate::proxy::ClientProxy;
use crate::services::client_service::ClientService;
use crate::services::endpoint_service::EndpointService;
use crate::services::service_description_service::ServiceDescriptionService;
use crate::state::global_conf::GlobalConfProvider;
use crate::state::store::ServerConfStore;
use responses::ApiError;

/// Application state containing all shared dependencies of the admin API
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<ServerConfStore>,
    pub service_descriptions: Arc<ServiceDescriptionService>,
    pub endpoints: Arc<EndpointService>,
    pub clients: Arc<ClientService>,
    pub gate: Arc<dyn AuthorityGate>,
    pub global_conf: Arc<dyn GlobalConfProvider>,
    pub audit_logger: Arc<AuditLogger>,
    pub metrics: Arc<Metrics>,
    pub config: Arc<Config>,
}

impl AppState {
    /// Count a read operation and convert its error
    pub fn observe<T>(&self, operation: &'static str, result: Result<T, ServerError>) -> Result<T, ApiError> {
        let outcome = if result.is_ok() { "ok" } else { "error" };
        self.metrics.record_admin(operation, outcome);
        result.map_err(ApiError::from)
    }

    /// Count and audit a mutating operation
    pub fn audited<T>(
        &self,
        principal: &Principal,
        operation: &'static str,
        target: &str,
        result: Result<T, ServerError>,
    ) -> Result<T, ApiError> {
        let outcome = match &result {
            Ok(_) => "ok",
            Err(ServerError::Warnings(_)) => "warnings",
            Err(_) => "error",
        };
        self.audit_logger.log(AuditEvent::AdminOperation {
            principal: principal.name.clone(),
            operation,
            target: target.to_string(),
            outcome,
        });
        self.observe(operation, result)
    }
}

fn with_common_layers<S>(router: Router<S>, body_limit: usize, timeout_secs: u64) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    // HandleErrorLayer must wrap the timeout to turn Elapsed into a response
    let middleware_stack = ServiceBuilder::new()
        .layer(HandleErrorLayer::new(|e: BoxError| async move {
            let status = if e.is::<tower::timeout::error::Elapsed>() {
                StatusCode::REQUEST_TIMEOUT
            } else {
                StatusCode::INTERNAL_SERVER_ERROR
            };
            (status, e.to_string())
        }))
        .timeout(Duration::from_secs(timeout_secs))
        .into_inner();

    router
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(middleware_stack)
        .layer(TraceLayer::new_for_http())
}

/// Create the admin router
///
/// Everything under `/api/v1` requires an `X-API-Key`; `/health` and
/// `/metrics` are open.
pub fn create_admin_router(app_state: AppState, auth_state: Arc<AuthState>) -> Router {
    let protected = Router::new()
        .route(
            "/api/v1/service-descriptions/:id",
            get(handlers::get_service_description)
                .patch(handlers::update_service_description)
                .delete(handlers::delete_service_description),
        )
        .route(
            "/api/v1/service-descriptions/:id/services",
            get(handlers::get_service_description_services),
        )
        .route(
            "/api/v1/service-descriptions/:id/enable",
            put(handlers::enable_service_description),
        )
        .route(
            "/api/v1/service-descriptions/:id/disable",
            put(handlers::disable_service_description),
        )
        .route(
            "/api/v1/service-descriptions/:id/refresh",
            post(handlers::refresh_service_description),
        )
        .route("/api/v1/clients/:id", get(handlers::get_client))
        .route(
            "/api/v1/clients/:id/service-descriptions",
            get(handlers::get_client_service_descriptions).post(handlers::add_client_service_description),
        )
        .route("/api/v1/services/:id/endpoints", post(handlers::add_endpoint))
        .route(
            "/api/v1/endpoints/:id",
            get(handlers::get_endpoint)
                .patch(handlers::update_endpoint)
                .delete(handlers::delete_endpoint),
        )
        .route(
            "/api/v1/endpoints/:id/access-rights",
            get(handlers::get_endpoint_access_rights).post(handlers::add_endpoint_access_right),
        )
        .route_layer(axum::middleware::from_fn_with_state(auth_state, auth_middleware));

    let public = Router::new()
        .route("/health", get(handlers::health_handler))
        .route("/metrics", get(handlers::metrics_handler));

    let body_limit = app_state.config.body_size_limit_bytes;
    let timeout_secs = app_state.config.request_timeout_secs;

    with_common_layers(protected.merge(public), body_limit, timeout_secs).with_state(app_state)
}

async fn proxy_fallback(State(proxy): State<Arc<ClientProxy>>, request: Request) -> Response {
    proxy.dispatch(request).await
}

/// Create the client proxy router; every path goes through the handler chain
pub fn create_proxy_router(proxy: Arc<ClientProxy>, config: &Config) -> Router {
    with_common_layers(
        Router::new().fallback(proxy_fallback),
        config.body_size_limit_bytes,
        config.proxy_timeout_secs + config.request_timeout_secs,
    )
    .with_state(proxy)
}
