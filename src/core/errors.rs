// Domain error types - every error maps to an HTTP status and a machine-readable deviation

use crate::core::models::Warning;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Kind of resource a lookup failed for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    ServiceDescription,
    Client,
    Endpoint,
    Service,
}

impl ResourceKind {
    pub fn deviation_code(&self) -> &'static str {
        match self {
            Self::ServiceDescription => "service_description_not_found",
            Self::Client => "client_not_found",
            Self::Endpoint => "endpoint_not_found",
            Self::Service => "service_not_found",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ServiceDescription => "Service description",
            Self::Client => "Client",
            Self::Endpoint => "Endpoint",
            Self::Service => "Service",
        };
        f.write_str(name)
    }
}

/// Machine-readable error tag plus its parameters, used by clients for i18n
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorDeviation {
    pub code: String,
    pub metadata: Vec<String>,
}

impl ErrorDeviation {
    fn new(code: &str, metadata: Vec<String>) -> Self {
        Self {
            code: code.to_string(),
            metadata,
        }
    }
}

/// Main error type for the security server
#[derive(Error, Debug)]
pub enum ServerError {
    /// Unknown or malformed resource id (HTTP 404)
    #[error("{kind} not found: {id}")]
    NotFound { kind: ResourceKind, id: String },

    /// Request rejected by validation (HTTP 400)
    #[error("Bad request ({code}): {message}")]
    BadRequest { code: &'static str, message: String },

    /// User tried to modify a generated endpoint (HTTP 400)
    #[error("Generated endpoint cannot be updated: {0}")]
    IllegalGeneratedEndpointUpdate(u64),

    /// User tried to delete a generated endpoint (HTTP 400)
    #[error("Generated endpoint cannot be removed: {0}")]
    IllegalGeneratedEndpointRemove(u64),

    /// Stored state violates the base endpoint invariant (HTTP 500)
    #[error("Base endpoint not found for client {client_id} and service code {service_code}")]
    BaseEndpointNotFound {
        client_id: String,
        service_code: String,
    },

    /// Mutation refused until the caller ignores warnings (HTTP 400)
    #[error("Warnings detected: {}", warning_codes(.0))]
    Warnings(Vec<Warning>),

    /// Resource already exists (HTTP 409)
    #[error("Conflict ({code}): {message}")]
    Conflict {
        code: &'static str,
        message: String,
        metadata: Vec<String>,
    },

    /// WSDL acquisition failure (HTTP 400 or 500)
    #[error("WSDL error: {0}")]
    Wsdl(#[from] WsdlError),

    /// Missing or unknown API key (HTTP 401)
    #[error("Not authenticated")]
    Unauthenticated,

    /// Principal lacks the required authority (HTTP 403)
    #[error("Access denied: missing authority {0}")]
    AccessDenied(String),

    /// Write-back or store failure (HTTP 500)
    #[error("Persistence failure: {0}")]
    Persistence(String),

    /// Configuration error (HTTP 500)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Cryptographic error (HTTP 500)
    #[error("Cryptographic error: {0}")]
    Crypto(#[from] CryptoError),
}

fn warning_codes(warnings: &[Warning]) -> String {
    warnings
        .iter()
        .map(|w| w.code.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// WSDL acquisition errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WsdlError {
    #[error("Malformed WSDL URL: {0}")]
    InvalidUrl(String),

    #[error("Failed to download WSDL from {url}: {reason}")]
    DownloadFailed { url: String, reason: String },

    #[error("Invalid WSDL at {url}: {reason}")]
    InvalidWsdl { url: String, reason: String },

    #[error("WSDL validation failed for {url}: {reason}")]
    ValidationFailed { url: String, reason: String },
}

impl WsdlError {
    pub fn deviation_code(&self) -> &'static str {
        match self {
            Self::InvalidUrl(_) => "invalid_wsdl_url",
            Self::DownloadFailed { .. } => "wsdl_download_failed",
            Self::InvalidWsdl { .. } => "invalid_wsdl",
            Self::ValidationFailed { .. } => "wsdl_validation_failed",
        }
    }

    /// Deviation metadata: the offending URL, then the reason when there is one
    pub fn metadata(&self) -> Vec<String> {
        match self {
            Self::InvalidUrl(url) => vec![url.clone()],
            Self::DownloadFailed { url, reason }
            | Self::InvalidWsdl { url, reason }
            | Self::ValidationFailed { url, reason } => vec![url.clone(), reason.clone()],
        }
    }
}

/// Cryptographic operation errors
#[derive(Error, Debug)]
pub enum CryptoError {
    /// Failed to load private key
    #[error("Failed to load private key: {0}")]
    KeyLoadError(String),

    /// Failed to load certificate chain
    #[error("Failed to load certificate chain: {0}")]
    CertificateLoadError(String),
}

impl ServerError {
    pub fn not_found(kind: ResourceKind, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }

    pub fn bad_request(code: &'static str, message: impl Into<String>) -> Self {
        Self::BadRequest {
            code,
            message: message.into(),
        }
    }

    /// Get HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            Self::NotFound { .. } => 404,
            Self::BadRequest { .. } => 400,
            Self::IllegalGeneratedEndpointUpdate(_) => 400,
            Self::IllegalGeneratedEndpointRemove(_) => 400,
            Self::BaseEndpointNotFound { .. } => 500,
            Self::Warnings(_) => 400,
            Self::Conflict { .. } => 409,
            Self::Wsdl(WsdlError::DownloadFailed { .. }) => 500,
            Self::Wsdl(_) => 400,
            Self::Unauthenticated => 401,
            Self::AccessDenied(_) => 403,
            Self::Persistence(_) => 500,
            Self::Configuration(_) => 500,
            Self::Crypto(_) => 500,
        }
    }

    /// Deviation code and metadata carried by the error payload
    pub fn deviation(&self) -> ErrorDeviation {
        match self {
            Self::NotFound { kind, id } => ErrorDeviation::new(kind.deviation_code(), vec![id.clone()]),
            Self::BadRequest { code, message } => ErrorDeviation::new(code, vec![message.clone()]),
            Self::IllegalGeneratedEndpointUpdate(id) => {
                ErrorDeviation::new("illegal_generated_endpoint_update", vec![id.to_string()])
            }
            Self::IllegalGeneratedEndpointRemove(id) => {
                ErrorDeviation::new("illegal_generated_endpoint_remove", vec![id.to_string()])
            }
            Self::BaseEndpointNotFound {
                client_id,
                service_code,
            } => ErrorDeviation::new(
                "base_endpoint_not_found",
                vec![client_id.clone(), service_code.clone()],
            ),
            Self::Warnings(_) => ErrorDeviation::new("warnings_detected", Vec::new()),
            Self::Conflict { code, metadata, .. } => ErrorDeviation::new(code, metadata.clone()),
            Self::Wsdl(e) => ErrorDeviation::new(e.deviation_code(), e.metadata()),
            Self::Unauthenticated => ErrorDeviation::new("not_authenticated", Vec::new()),
            Self::AccessDenied(authority) => ErrorDeviation::new("access_denied", vec![authority.clone()]),
            Self::Persistence(_) => ErrorDeviation::new("persistence_failure", Vec::new()),
            Self::Configuration(_) | Self::Crypto(_) => ErrorDeviation::new("internal_error", Vec::new()),
        }
    }

    /// Warnings that caused the refusal, empty for any other error
    pub fn warnings(&self) -> &[Warning] {
        match self {
            Self::Warnings(warnings) => warnings,
            _ => &[],
        }
    }

    /// Get user-facing error message (no internal details for server errors)
    pub fn user_message(&self) -> String {
        match self {
            Self::Persistence(_) | Self::Configuration(_) | Self::Crypto(_) => {
                "Internal server error".to_string()
            }
            Self::Wsdl(WsdlError::DownloadFailed { url, .. }) => {
                format!("Failed to download WSDL from {}", url)
            }
            other => other.to_string(),
        }
    }
}
