// WSDL download over http(s) or from local `file:` URLs

use crate::core::errors::WsdlError;
use crate::wsdl::parser::parse_wsdl;
use crate::wsdl::{NormalizedService, WsdlFetcher, WsdlUrlValidator};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

/// Accepts absolute `http`, `https` and `file` URLs
#[derive(Debug, Default, Clone)]
pub struct DefaultWsdlUrlValidator;

impl WsdlUrlValidator for DefaultWsdlUrlValidator {
    fn is_valid_wsdl_url(&self, url: &str) -> bool {
        match Url::parse(url) {
            Ok(parsed) => match parsed.scheme() {
                "http" | "https" => parsed.host_str().map(|h| !h.is_empty()).unwrap_or(false),
                "file" => true,
                _ => false,
            },
            Err(_) => false,
        }
    }
}

/// Production fetcher backed by a pooled reqwest client
pub struct HttpWsdlFetcher {
    http_client: reqwest::Client,
}

impl HttpWsdlFetcher {
    pub fn new(timeout: Duration) -> Result<Self, WsdlError> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()
            .map_err(|e| WsdlError::DownloadFailed {
                url: String::new(),
                reason: format!("Failed to build HTTP client: {}", e),
            })?;

        Ok(Self { http_client })
    }

    async fn download(&self, url: &str) -> Result<String, WsdlError> {
        if let Some(path) = file_path(url) {
            debug!(path = %path, "Reading WSDL from file");
            return tokio::fs::read_to_string(path)
                .await
                .map_err(|e| WsdlError::DownloadFailed {
                    url: url.to_string(),
                    reason: e.to_string(),
                });
        }

        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(|e| WsdlError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        if !response.status().is_success() {
            warn!(url = %url, status = %response.status(), "WSDL download returned error status");
            return Err(WsdlError::DownloadFailed {
                url: url.to_string(),
                reason: format!("HTTP status {}", response.status()),
            });
        }

        response.text().await.map_err(|e| WsdlError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })
    }
}

/// Local path of a `file:` URL; relative paths (`file:dir/x.wsdl`) are kept relative
fn file_path(url: &str) -> Option<&str> {
    url.strip_prefix("file://").or_else(|| url.strip_prefix("file:"))
}

#[async_trait]
impl WsdlFetcher for HttpWsdlFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<NormalizedService>, WsdlError> {
        let body = self.download(url).await?;
        let services = parse_wsdl(&body).map_err(|reason| WsdlError::InvalidWsdl {
            url: url.to_string(),
            reason,
        })?;
        info!(url = %url, services = services.len(), "WSDL fetched");
        Ok(services)
    }
}
