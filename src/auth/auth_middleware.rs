// Axum authentication middleware for the admin API

use crate::api::responses::ApiError;
use crate::auth::api_key::ApiKey;
use crate::auth::audit_logger::{AuditEvent, AuditLogger, RequestOrigin};
use crate::auth::principal_store::PrincipalStore;
use crate::core::errors::ServerError;
use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

pub const API_KEY_HEADER: &str = "X-API-Key";

/// Authentication state containing all dependencies
#[derive(Clone)]
pub struct AuthState {
    pub principals: Arc<PrincipalStore>,
    pub audit_logger: Arc<AuditLogger>,
}

/// Authentication middleware function
///
/// Resolves the `X-API-Key` header to a `Principal` and stores it in the
/// request extensions for the handlers.
pub async fn auth_middleware(
    State(auth_state): State<Arc<AuthState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let origin = RequestOrigin {
        ip_address: extract_ip_address(request.headers()),
        user_agent: extract_user_agent(request.headers()),
    };

    let Some(api_key_str) = extract_api_key(request.headers()) else {
        auth_state.audit_logger.log_with_origin(
            AuditEvent::AuthFailure {
                reason: "Missing API key".to_string(),
                api_key_hash: None,
            },
            &origin,
        );
        return Err(ServerError::Unauthenticated.into());
    };

    let api_key = ApiKey::new(&api_key_str);
    let Some(principal) = auth_state.principals.authenticate(&api_key) else {
        auth_state.audit_logger.log_with_origin(
            AuditEvent::AuthFailure {
                reason: "Invalid API key".to_string(),
                api_key_hash: Some(api_key.hash()),
            },
            &origin,
        );
        return Err(ServerError::Unauthenticated.into());
    };

    auth_state.audit_logger.log_with_origin(
        AuditEvent::AuthSuccess {
            principal: principal.name.clone(),
        },
        &origin,
    );

    request.extensions_mut().insert(principal);

    Ok(next.run(request).await)
}

fn extract_api_key(headers: &HeaderMap) -> Option<String> {
    headers
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
}

/// Checks `X-Forwarded-For` first (for proxied requests), then `X-Real-IP`.
fn extract_ip_address(headers: &HeaderMap) -> Option<String> {
    headers
        .get("X-Forwarded-For")
        .or_else(|| headers.get("X-Real-IP"))
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
}

fn extract_user_agent(headers: &HeaderMap) -> Option<String> {
    headers
        .get("User-Agent")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
}
