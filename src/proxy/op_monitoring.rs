// Operational monitoring record of one proxied request

use crate::core::fault::CodedFault;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

#[derive(Debug, Clone, Serialize)]
pub struct OpMonitoringData {
    pub message_id: Option<String>,
    pub client_id: Option<String>,
    pub service_id: Option<String>,
    pub rest_path: Option<String>,
    pub request_in_ts: DateTime<Utc>,
    pub response_out_ts: Option<DateTime<Utc>>,
    pub succeeded: bool,
    pub fault_code: Option<String>,
}

impl OpMonitoringData {
    pub fn new() -> Self {
        Self {
            message_id: None,
            client_id: None,
            service_id: None,
            rest_path: None,
            request_in_ts: Utc::now(),
            response_out_ts: None,
            succeeded: false,
            fault_code: None,
        }
    }

    pub fn record_success(&mut self) {
        self.succeeded = true;
        self.response_out_ts = Some(Utc::now());
    }

    pub fn record_fault(&mut self, fault: &CodedFault) {
        self.succeeded = false;
        self.fault_code = Some(fault.code.clone());
        self.response_out_ts = Some(Utc::now());
    }

    /// Emit as a structured event under the `op_monitoring` target
    pub fn emit(&self) {
        let duration_ms = self
            .response_out_ts
            .map(|out| (out - self.request_in_ts).num_milliseconds());
        info!(
            target: "op_monitoring",
            message_id = ?self.message_id,
            client_id = ?self.client_id,
            service_id = ?self.service_id,
            rest_path = ?self.rest_path,
            succeeded = self.succeeded,
            fault_code = ?self.fault_code,
            duration_ms = ?duration_ms,
            "Proxy request completed"
        );
    }
}

impl Default for OpMonitoringData {
    fn default() -> Self {
        Self::new()
    }
}
