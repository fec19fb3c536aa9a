// Prometheus metrics for the proxy and the admin API

use crate::core::errors::ServerError;
use prometheus::{Encoder, IntCounterVec, Opts, Registry, TextEncoder};

pub struct Metrics {
    registry: Registry,
    proxy_requests: IntCounterVec,
    admin_operations: IntCounterVec,
}

impl Metrics {
    pub fn new() -> Result<Self, ServerError> {
        let registry = Registry::new();

        let proxy_requests = IntCounterVec::new(
            Opts::new("proxy_requests_total", "Client proxy requests by outcome"),
            &["outcome"],
        )
        .map_err(|e| ServerError::Configuration(format!("Failed to create metric: {}", e)))?;
        let admin_operations = IntCounterVec::new(
            Opts::new("admin_operations_total", "Admin API operations by operation and outcome"),
            &["operation", "outcome"],
        )
        .map_err(|e| ServerError::Configuration(format!("Failed to create metric: {}", e)))?;

        registry
            .register(Box::new(proxy_requests.clone()))
            .map_err(|e| ServerError::Configuration(format!("Failed to register metric: {}", e)))?;
        registry
            .register(Box::new(admin_operations.clone()))
            .map_err(|e| ServerError::Configuration(format!("Failed to register metric: {}", e)))?;

        Ok(Self {
            registry,
            proxy_requests,
            admin_operations,
        })
    }

    pub fn record_proxy(&self, outcome: &str) {
        self.proxy_requests.with_label_values(&[outcome]).inc();
    }

    pub fn record_admin(&self, operation: &str, outcome: &str) {
        self.admin_operations.with_label_values(&[operation, outcome]).inc();
    }

    pub fn proxy_count(&self, outcome: &str) -> u64 {
        self.proxy_requests.with_label_values(&[outcome]).get()
    }

    pub fn admin_count(&self, operation: &str, outcome: &str) -> u64 {
        self.admin_operations.with_label_values(&[operation, outcome]).get()
    }

    /// Text exposition format
    pub fn encode(&self) -> Result<String, ServerError> {
        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&self.registry.gather(), &mut buffer)
            .map_err(|e| ServerError::Configuration(format!("Failed to encode metrics: {}", e)))?;
        String::from_utf8(buffer)
            .map_err(|e| ServerError::Configuration(format!("Metrics are not UTF-8: {}", e)))
    }
}
