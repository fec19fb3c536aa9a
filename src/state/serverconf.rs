// Server configuration arena: clients own their descriptions, endpoints and ACL entries

use crate::core::errors::{ResourceKind, ServerError};
use crate::core::models::{parse_id, Client, ClientId, Endpoint, ServiceDescription};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Last id handed out per entity; the next id is `last + 1`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdSequences {
    pub service_description: u64,
    pub endpoint: u64,
    pub acl_entry: u64,
}

/// Complete server configuration as kept in memory and written back to YAML
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServerConf {
    #[serde(default)]
    pub clients: Vec<Client>,
    #[serde(default)]
    pub sequences: IdSequences,
}

/// Repository view over the arena used by the admin services
pub trait ServerConfRepository {
    fn get_client(&self, id: &ClientId) -> Result<Client, ServerError>;
    fn get_service_description(&self, id: &str) -> Result<ServiceDescription, ServerError>;
    fn get_client_by_service_description_id(&self, id: &str) -> Result<Client, ServerError>;
    fn get_endpoint(&self, id: &str) -> Result<Endpoint, ServerError>;
    fn get_client_by_endpoint_id(&self, id: &str) -> Result<Client, ServerError>;

    /// Replace the stored client with the same id, or add it
    fn save_client(&mut self, client: Client) -> Result<(), ServerError>;
    /// Replace an existing description in place
    fn save_service_description(&mut self, sd: ServiceDescription) -> Result<(), ServerError>;
    fn delete_service_description(&mut self, id: &str) -> Result<(), ServerError>;

    fn next_service_description_id(&mut self) -> u64;
    fn next_endpoint_id(&mut self) -> u64;
    fn next_acl_entry_id(&mut self) -> u64;
}

impl ServerConf {
    pub fn new(clients: Vec<Client>) -> Self {
        let mut conf = Self {
            clients,
            sequences: IdSequences::default(),
        };
        conf.sync_sequences();
        conf
    }

    /// Raise every sequence to at least the highest id present
    pub fn sync_sequences(&mut self) {
        for client in &self.clients {
            for sd in &client.service_descriptions {
                self.sequences.service_description = self.sequences.service_description.max(sd.id);
            }
            for endpoint in &client.endpoints {
                self.sequences.endpoint = self.sequences.endpoint.max(endpoint.id);
            }
            for entry in &client.acl {
                self.sequences.acl_entry = self.sequences.acl_entry.max(entry.id);
            }
        }
    }

    pub fn client(&self, id: &ClientId) -> Option<&Client> {
        self.clients.iter().find(|c| &c.id == id)
    }

    fn client_index_by_service_description(&self, sd_id: u64) -> Option<usize> {
        self.clients
            .iter()
            .position(|c| c.service_descriptions.iter().any(|sd| sd.id == sd_id))
    }

    fn client_index_by_endpoint(&self, endpoint_id: u64) -> Option<usize> {
        self.clients
            .iter()
            .position(|c| c.endpoints.iter().any(|e| e.id == endpoint_id))
    }

    /// Check the structural invariants of every client.
    ///
    /// Reports the first violation found; nothing is repaired.
    pub fn check_invariants(&self) -> Result<(), String> {
        let mut sd_ids = BTreeSet::new();
        let mut endpoint_ids = BTreeSet::new();
        let mut acl_ids = BTreeSet::new();

        for client in &self.clients {
            for sd in &client.service_descriptions {
                if !sd_ids.insert(sd.id) {
                    return Err(format!("duplicate service description id {}", sd.id));
                }
            }
            for endpoint in &client.endpoints {
                if !endpoint_ids.insert(endpoint.id) {
                    return Err(format!("duplicate endpoint id {}", endpoint.id));
                }
            }

            for code in client.service_codes() {
                let base_count = client
                    .endpoints
                    .iter()
                    .filter(|e| e.service_code == code && e.is_base_endpoint() && e.generated)
                    .count();
                if base_count != 1 {
                    return Err(format!(
                        "client {} has {} base endpoints for service code {}",
                        client.id, base_count, code
                    ));
                }
            }

            for entry in &client.acl {
                if !acl_ids.insert(entry.id) {
                    return Err(format!("duplicate access right id {}", entry.id));
                }
                if client.endpoint(entry.endpoint_id).is_none() {
                    return Err(format!(
                        "client {} has access right {} for unknown endpoint {}",
                        client.id, entry.id, entry.endpoint_id
                    ));
                }
            }
        }

        Ok(())
    }
}

fn service_description_not_found(id: &str) -> ServerError {
    ServerError::not_found(ResourceKind::ServiceDescription, id)
}

fn endpoint_not_found(id: &str) -> ServerError {
    ServerError::not_found(ResourceKind::Endpoint, id)
}

impl ServerConfRepository for ServerConf {
    fn get_client(&self, id: &ClientId) -> Result<Client, ServerError> {
        self.client(id)
            .cloned()
            .ok_or_else(|| ServerError::not_found(ResourceKind::Client, id.to_string()))
    }

    fn get_service_description(&self, id: &str) -> Result<ServiceDescription, ServerError> {
        let sd_id = parse_id(id).ok_or_else(|| service_description_not_found(id))?;
        self.clients
            .iter()
            .find_map(|c| c.service_description(sd_id))
            .cloned()
            .ok_or_else(|| service_description_not_found(id))
    }

    fn get_client_by_service_description_id(&self, id: &str) -> Result<Client, ServerError> {
        let sd_id = parse_id(id).ok_or_else(|| service_description_not_found(id))?;
        self.client_index_by_service_description(sd_id)
            .map(|idx| self.clients[idx].clone())
            .ok_or_else(|| service_description_not_found(id))
    }

    fn get_endpoint(&self, id: &str) -> Result<Endpoint, ServerError> {
        let endpoint_id = parse_id(id).ok_or_else(|| endpoint_not_found(id))?;
        self.clients
            .iter()
            .find_map(|c| c.endpoint(endpoint_id))
            .cloned()
            .ok_or_else(|| endpoint_not_found(id))
    }

    fn get_client_by_endpoint_id(&self, id: &str) -> Result<Client, ServerError> {
        let endpoint_id = parse_id(id).ok_or_else(|| endpoint_not_found(id))?;
        self.client_index_by_endpoint(endpoint_id)
            .map(|idx| self.clients[idx].clone())
            .ok_or_else(|| endpoint_not_found(id))
    }

    fn save_client(&mut self, client: Client) -> Result<(), ServerError> {
        match self.clients.iter_mut().find(|c| c.id == client.id) {
            Some(existing) => *existing = client,
            None => self.clients.push(client),
        }
        Ok(())
    }

    fn save_service_description(&mut self, sd: ServiceDescription) -> Result<(), ServerError> {
        let idx = self
            .client_index_by_service_description(sd.id)
            .ok_or_else(|| service_description_not_found(&sd.id.to_string()))?;
        if let Some(existing) = self.clients[idx].service_description_mut(sd.id) {
            *existing = sd;
        }
        Ok(())
    }

    fn delete_service_description(&mut self, id: &str) -> Result<(), ServerError> {
        let sd_id = parse_id(id).ok_or_else(|| service_description_not_found(id))?;
        let idx = self
            .client_index_by_service_description(sd_id)
            .ok_or_else(|| service_description_not_found(id))?;
        self.clients[idx].service_descriptions.retain(|sd| sd.id != sd_id);
        Ok(())
    }

    fn next_service_description_id(&mut self) -> u64 {
        self.sequences.service_description += 1;
        self.sequences.service_description
    }

    fn next_endpoint_id(&mut self) -> u64 {
        self.sequences.endpoint += 1;
        self.sequences.endpoint
    }

    fn next_acl_entry_id(&mut self) -> u64 {
        self.sequences.acl_entry += 1;
        self.sequences.acl_entry
    }
}
