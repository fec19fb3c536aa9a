// Security and admin audit event logging

use crate::auth::api_key::ApiKeyHash;
use tracing::{info, warn};

/// Audit event type
#[derive(Debug, Clone)]
pub enum AuditEvent {
    AuthSuccess {
        principal: String,
    },
    AuthFailure {
        reason: String,
        api_key_hash: Option<ApiKeyHash>,
    },
    AccessDenied {
        principal: String,
        authority: String,
    },
    AdminOperation {
        principal: String,
        operation: &'static str,
        target: String,
        outcome: &'static str,
    },
}

/// Request origin attached to authentication events
#[derive(Debug, Clone, Default)]
pub struct RequestOrigin {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

/// Audit logger for security events
///
/// Events are emitted as structured tracing records under the `audit` target.
#[derive(Debug, Default)]
pub struct AuditLogger;

impl AuditLogger {
    pub fn new() -> Self {
        Self
    }

    pub fn log(&self, event: AuditEvent) {
        self.log_with_origin(event, &RequestOrigin::default());
    }

    pub fn log_with_origin(&self, event: AuditEvent, origin: &RequestOrigin) {
        match event {
            AuditEvent::AuthSuccess { principal } => {
                info!(
                    target: "audit",
                    principal = %principal,
                    ip_address = ?origin.ip_address,
                    user_agent = ?origin.user_agent,
                    "Authentication successful"
                );
            }
            AuditEvent::AuthFailure {
                reason,
                api_key_hash,
            } => {
                warn!(
                    target: "audit",
                    api_key_hash = ?api_key_hash.as_ref().map(|h| h.as_str()),
                    ip_address = ?origin.ip_address,
                    user_agent = ?origin.user_agent,
                    reason = %reason,
                    "Authentication failed"
                );
            }
            AuditEvent::AccessDenied {
                principal,
                authority,
            } => {
                warn!(
                    target: "audit",
                    principal = %principal,
                    authority = %authority,
                    "Access denied"
                );
            }
            AuditEvent::AdminOperation {
                principal,
                operation,
                target,
                outcome,
            } => {
                info!(
                    target: "audit",
                    principal = %principal,
                    operation = operation,
                    resource = %target,
                    outcome = outcome,
                    "Admin operation"
                );
            }
        }
    }
}
