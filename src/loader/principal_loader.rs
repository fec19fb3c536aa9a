// YAML admin principal loading - API key hashes with granted authorities

use crate::auth::api_key::ApiKeyHash;
use crate::auth::authority::{Authority, Principal};
use crate::auth::principal_store::PrincipalStore;
use crate::core::errors::ServerError;
use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::path::Path;

#[derive(Debug, Deserialize)]
struct ApiKeysYaml {
    principals: Vec<PrincipalEntry>,
}

#[derive(Debug, Deserialize)]
struct PrincipalEntry {
    name: String,
    api_key_hash: ApiKeyHash,
    #[serde(default)]
    authorities: Vec<Authority>,
}

pub struct PrincipalLoader;

impl PrincipalLoader {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<PrincipalStore, ServerError> {
        let path_ref = path.as_ref();
        let yaml_content = fs::read_to_string(path_ref).map_err(|e| {
            ServerError::Configuration(format!("Failed to read API keys file {:?}: {}", path_ref, e))
        })?;
        Self::from_yaml_str(&yaml_content)
    }

    pub fn from_yaml_str(yaml_content: &str) -> Result<PrincipalStore, ServerError> {
        let parsed: ApiKeysYaml = serde_yaml::from_str(yaml_content).map_err(|e| {
            ServerError::Configuration(format!("Failed to parse API keys YAML: {}", e))
        })?;

        let mut seen = HashSet::new();
        let mut entries = Vec::with_capacity(parsed.principals.len());
        for entry in parsed.principals {
            if !seen.insert(entry.api_key_hash.clone()) {
                return Err(ServerError::Configuration(format!(
                    "Duplicate API key hash for principal '{}'",
                    entry.name
                )));
            }
            entries.push((entry.api_key_hash, Principal::new(&entry.name, entry.authorities)));
        }

        Ok(PrincipalStore::new(entries))
    }
}
