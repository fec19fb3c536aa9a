// YAML server configuration loading - clients, service descriptions, endpoints and ACL

use crate::core::errors::ServerError;
use crate::state::serverconf::ServerConf;
use std::fs;
use std::path::Path;
use tracing::info;

pub struct ServerConfLoader;

impl ServerConfLoader {
    /// Load and check a server configuration file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<ServerConf, ServerError> {
        let path_ref = path.as_ref();

        if !path_ref.exists() {
            return Err(ServerError::Configuration(format!(
                "Server configuration file not found at {:?}",
                path_ref
            )));
        }

        let yaml_content = fs::read_to_string(path_ref).map_err(|e| {
            ServerError::Configuration(format!("Failed to read server configuration: {}", e))
        })?;

        let conf = Self::from_yaml_str(&yaml_content)?;

        info!(
            path = ?path_ref,
            clients = conf.clients.len(),
            "Server configuration loaded"
        );

        Ok(conf)
    }

    pub fn from_yaml_str(yaml_content: &str) -> Result<ServerConf, ServerError> {
        let mut conf: ServerConf = serde_yaml::from_str(yaml_content).map_err(|e| {
            ServerError::Configuration(format!("Failed to parse server configuration YAML: {}", e))
        })?;

        conf.sync_sequences();
        conf.check_invariants().map_err(|e| {
            ServerError::Configuration(format!("Inconsistent server configuration: {}", e))
        })?;

        Ok(conf)
    }
}
