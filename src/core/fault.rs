// Coded faults returned by the client proxy

use thiserror::Error;
use uuid::Uuid;

pub const SERVER_CLIENTPROXY_X: &str = "Server.ClientProxy";
pub const CLIENT_CLIENTPROXY_X: &str = "Client.ClientProxy";

pub const X_SSL_AUTH_FAILED: &str = "SslAuthenticationFailed";
pub const X_OUTDATED_GLOBALCONF: &str = "OutdatedGlobalConf";
pub const X_NETWORK_ERROR: &str = "NetworkError";
pub const X_INVALID_REQUEST: &str = "InvalidRequest";
pub const X_INVALID_CLIENT_IDENTIFIER: &str = "InvalidClientIdentifier";
pub const X_INTERNAL_ERROR: &str = "InternalError";

/// Fault with a dotted code (`Server.ClientProxy.NetworkError`), a summary and a detail
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{code}: {summary}")]
pub struct CodedFault {
    pub code: String,
    pub summary: String,
    pub detail: String,
}

impl CodedFault {
    /// Build a fault; the detail defaults to a fresh correlation id
    pub fn new(code: impl Into<String>, summary: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            summary: summary.into(),
            detail: Uuid::new_v4().to_string(),
        }
    }

    pub fn server(code: &str, summary: impl Into<String>) -> Self {
        Self::new(format!("{}.{}", SERVER_CLIENTPROXY_X, code), summary)
    }

    pub fn client(code: &str, summary: impl Into<String>) -> Self {
        Self::new(format!("{}.{}", CLIENT_CLIENTPROXY_X, code), summary)
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = detail.into();
        self
    }

    pub fn is_server_fault(&self) -> bool {
        self.code.starts_with("Server.")
    }
}
