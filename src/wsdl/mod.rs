// WSDL collaborators: URL validation, download and parsing, validation

pub mod fetcher;
pub mod parser;
pub mod validator;

use crate::core::errors::WsdlError;
use crate::core::models::Service;
use async_trait::async_trait;

/// A service as published by a WSDL, before it is attached to a description
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedService {
    pub service_code: String,
    pub service_version: Option<String>,
    pub title: Option<String>,
    pub url: String,
    pub timeout: u32,
    pub ssl_auth: bool,
}

impl NormalizedService {
    pub fn full_service_code(&self) -> String {
        match &self.service_version {
            Some(version) if !version.is_empty() => format!("{}.{}", self.service_code, version),
            _ => self.service_code.clone(),
        }
    }
}

impl From<NormalizedService> for Service {
    fn from(n: NormalizedService) -> Self {
        Service {
            service_code: n.service_code,
            service_version: n.service_version,
            title: n.title,
            url: n.url,
            timeout: n.timeout,
            ssl_auth: n.ssl_auth,
        }
    }
}

/// Downloads a WSDL and turns it into a service list
#[async_trait]
pub trait WsdlFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Vec<NormalizedService>, WsdlError>;
}

/// Decides whether a string is an acceptable WSDL location
pub trait WsdlUrlValidator: Send + Sync {
    fn is_valid_wsdl_url(&self, url: &str) -> bool;
}

/// Checks a WSDL beyond parsing; returns human-readable warnings
#[async_trait]
pub trait WsdlValidator: Send + Sync {
    async fn validate(&self, url: &str) -> Result<Vec<String>, WsdlError>;
}

pub use fetcher::{DefaultWsdlUrlValidator, HttpWsdlFetcher};
pub use parser::parse_wsdl;
pub use validator::{CommandWsdlValidator, NoopWsdlValidator};
