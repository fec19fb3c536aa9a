// WSDL validation hooks

use crate::core::errors::WsdlError;
use crate::wsdl::WsdlValidator;
use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, warn};

/// Validator that accepts everything
#[derive(Debug, Default, Clone)]
pub struct NoopWsdlValidator;

#[async_trait]
impl WsdlValidator for NoopWsdlValidator {
    async fn validate(&self, _url: &str) -> Result<Vec<String>, WsdlError> {
        Ok(Vec::new())
    }
}

/// Runs an external validator as `<command> <url>`.
///
/// A non-zero exit fails validation with stderr as the reason; every
/// non-empty stdout line becomes a warning.
#[derive(Debug, Clone)]
pub struct CommandWsdlValidator {
    command: String,
}

impl CommandWsdlValidator {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }
}

#[async_trait]
impl WsdlValidator for CommandWsdlValidator {
    async fn validate(&self, url: &str) -> Result<Vec<String>, WsdlError> {
        debug!(command = %self.command, url = %url, "Running WSDL validator");

        let output = Command::new(&self.command)
            .arg(url)
            .output()
            .await
            .map_err(|e| WsdlError::ValidationFailed {
                url: url.to_string(),
                reason: format!("Failed to run validator: {}", e),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            warn!(url = %url, status = ?output.status.code(), "WSDL validator rejected document");
            return Err(WsdlError::ValidationFailed {
                url: url.to_string(),
                reason: stderr,
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout)
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect())
    }
}
