// Checks run before the client proxy accepts a request

use crate::core::fault::{CodedFault, X_SSL_AUTH_FAILED};
use crate::state::global_conf::GlobalConfProvider;
use crate::state::key_conf::KeyConfProvider;
use std::sync::Arc;

pub struct AuthPrecondition {
    global_conf: Arc<dyn GlobalConfProvider>,
    key_conf: Arc<dyn KeyConfProvider>,
    ssl_enabled: bool,
}

impl AuthPrecondition {
    pub fn new(global_conf: Arc<dyn GlobalConfProvider>, key_conf: Arc<dyn KeyConfProvider>, ssl_enabled: bool) -> Self {
        Self {
            global_conf,
            key_conf,
            ssl_enabled,
        }
    }

    /// Global configuration must be valid; with SSL enabled the server also
    /// needs an authentication certificate chain.
    pub fn verify_can_process(&self) -> Result<(), CodedFault> {
        self.global_conf.verify_validity()?;

        if !self.ssl_enabled {
            return Ok(());
        }

        if !self.key_conf.auth_key().has_cert_chain() {
            return Err(CodedFault::server(
                X_SSL_AUTH_FAILED,
                "Security server has no valid authentication certificate",
            ));
        }

        Ok(())
    }
}
