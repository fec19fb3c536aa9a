// Endpoint reconciler: endpoint list and access rights of a client

use crate::core::errors::{ResourceKind, ServerError};
use crate::core::models::{
    parse_id, parse_service_id, AclEntry, Client, ClientId, Endpoint, Service, ANY_METHOD,
};
use crate::state::serverconf::{ServerConf, ServerConfRepository};
use crate::state::store::ServerConfStore;
use chrono::Utc;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info};

/// Methods an endpoint may be bound to
pub const HTTP_METHODS: [&str; 9] = [
    ANY_METHOD, "GET", "POST", "PUT", "PATCH", "DELETE", "HEAD", "OPTIONS", "TRACE",
];

/// The unique generated `*` / `**` endpoint of a service code
pub fn base_endpoint<'a>(client: &'a Client, service_code: &str) -> Result<&'a Endpoint, ServerError> {
    client
        .endpoints
        .iter()
        .find(|e| e.service_code == service_code && e.is_base_endpoint())
        .ok_or_else(|| ServerError::BaseEndpointNotFound {
            client_id: client.id.to_string(),
            service_code: service_code.to_string(),
        })
}

/// What `reconcile` changed
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReconcileReport {
    pub removed_endpoints: Vec<u64>,
    pub removed_access_rights: usize,
    pub added_base_endpoints: Vec<u64>,
}

/// Bring a client's endpoints in line with a service-set change.
///
/// `client` must already carry the new service set. Service codes of
/// `old_services` that no description of the client publishes anymore lose
/// every endpoint and the access rights pointing at them; codes of
/// `new_services` without a base endpoint get one.
pub fn reconcile(
    client: &mut Client,
    old_services: &[Service],
    new_services: &[Service],
    next_endpoint_id: &mut dyn FnMut() -> u64,
) -> ReconcileReport {
    let remaining = client.service_codes();
    let mut report = ReconcileReport::default();

    let removed_codes: BTreeSet<&str> = old_services
        .iter()
        .map(|s| s.service_code.as_str())
        .filter(|code| !remaining.contains(*code))
        .collect();

    if !removed_codes.is_empty() {
        let endpoint_ids: BTreeSet<u64> = client
            .endpoints
            .iter()
            .filter(|e| removed_codes.contains(e.service_code.as_str()))
            .map(|e| e.id)
            .collect();
        report.removed_access_rights = client.remove_endpoints(&endpoint_ids);
        report.removed_endpoints = endpoint_ids.into_iter().collect();
    }

    let added_codes: BTreeSet<&str> = new_services
        .iter()
        .map(|s| s.service_code.as_str())
        .filter(|code| remaining.contains(*code))
        .collect();

    for code in added_codes {
        let has_base = client
            .endpoints
            .iter()
            .any(|e| e.service_code == code && e.is_base_endpoint());
        if !has_base {
            let endpoint = Endpoint::base(next_endpoint_id(), code);
            report.added_base_endpoints.push(endpoint.id);
            client.endpoints.push(endpoint);
        }
    }

    debug!(
        client_id = %client.id,
        removed_endpoints = ?report.removed_endpoints,
        removed_access_rights = report.removed_access_rights,
        added_base_endpoints = ?report.added_base_endpoints,
        "Endpoints reconciled"
    );

    report
}

fn normalize_method(method: &str) -> Result<String, ServerError> {
    let upper = method.trim().to_ascii_uppercase();
    if HTTP_METHODS.contains(&upper.as_str()) {
        Ok(upper)
    } else {
        Err(ServerError::bad_request(
            "invalid_http_method",
            format!("Invalid HTTP method: '{}'", method),
        ))
    }
}

fn ensure_unique(client: &Client, candidate: &Endpoint) -> Result<(), ServerError> {
    let duplicate = client.endpoints.iter().any(|e| {
        e.id != candidate.id && e.matches(&candidate.service_code, &candidate.method, &candidate.path)
    });
    if duplicate {
        return Err(ServerError::Conflict {
            code: "endpoint_already_exists",
            message: format!(
                "Endpoint {} {} already exists for service code {}",
                candidate.method, candidate.path, candidate.service_code
            ),
            metadata: vec![candidate.method.clone(), candidate.path.clone()],
        });
    }
    Ok(())
}

fn locate_service(conf: &ServerConf, service_id: &str) -> Result<(Client, Service), ServerError> {
    let not_found = || ServerError::not_found(ResourceKind::Service, service_id);
    let (client_id, full_code) = parse_service_id(service_id).ok_or_else(not_found)?;
    let client = conf.get_client(&client_id).map_err(|_| not_found())?;
    let service = client.find_service(&full_code).cloned().ok_or_else(not_found)?;
    Ok((client, service))
}

/// Endpoint and access-right operations of the admin API
pub struct EndpointService {
    store: Arc<ServerConfStore>,
}

impl EndpointService {
    pub fn new(store: Arc<ServerConfStore>) -> Self {
        Self { store }
    }

    pub async fn get_endpoint(&self, id: &str) -> Result<Endpoint, ServerError> {
        self.store.read(|conf| conf.get_endpoint(id)).await
    }

    /// Base endpoint of the service `{client-id}:{full-service-code}`
    pub async fn get_service_base_endpoint(&self, service_id: &str) -> Result<Endpoint, ServerError> {
        self.store
            .read(|conf| {
                let (client, service) = locate_service(conf, service_id)?;
                base_endpoint(&client, &service.service_code).cloned()
            })
            .await
    }

    /// Change method and/or path of a user endpoint
    pub async fn update_endpoint(
        &self,
        id: &str,
        method: Option<&str>,
        path: Option<&str>,
    ) -> Result<Endpoint, ServerError> {
        if path == Some("") {
            return Err(ServerError::bad_request(
                "endpoint_path_empty",
                "Endpoint path cannot be empty",
            ));
        }
        if method.is_none() && path.is_none() {
            return Err(ServerError::bad_request(
                "endpoint_update_empty",
                "Method and path cannot both be missing",
            ));
        }
        let method = method.map(normalize_method).transpose()?;

        let updated = self
            .store
            .transaction(|conf| {
                let mut client = conf.get_client_by_endpoint_id(id)?;
                let endpoint_id = parse_id(id).ok_or_else(|| ServerError::not_found(ResourceKind::Endpoint, id))?;

                let mut endpoint = client
                    .endpoint(endpoint_id)
                    .cloned()
                    .ok_or_else(|| ServerError::not_found(ResourceKind::Endpoint, id))?;
                if endpoint.generated {
                    return Err(ServerError::IllegalGeneratedEndpointUpdate(endpoint_id));
                }

                if let Some(method) = method {
                    endpoint.method = method;
                }
                if let Some(path) = path {
                    endpoint.path = path.to_string();
                }
                ensure_unique(&client, &endpoint)?;

                if let Some(stored) = client.endpoint_mut(endpoint_id) {
                    *stored = endpoint.clone();
                }
                conf.save_client(client)?;
                Ok(endpoint)
            })
            .await?;

        info!(endpoint_id = updated.id, method = %updated.method, path = %updated.path, "Endpoint updated");
        Ok(updated)
    }

    /// Remove a user endpoint together with its access rights
    pub async fn delete_endpoint(&self, id: &str) -> Result<(), ServerError> {
        let removed_access_rights = self
            .store
            .transaction(|conf| {
                let mut client = conf.get_client_by_endpoint_id(id)?;
                let endpoint_id = parse_id(id).ok_or_else(|| ServerError::not_found(ResourceKind::Endpoint, id))?;
                let endpoint = client
                    .endpoint(endpoint_id)
                    .ok_or_else(|| ServerError::not_found(ResourceKind::Endpoint, id))?;
                if endpoint.generated {
                    return Err(ServerError::IllegalGeneratedEndpointRemove(endpoint_id));
                }

                let removed = client.remove_endpoints(&BTreeSet::from([endpoint_id]));
                conf.save_client(client)?;
                Ok(removed)
            })
            .await?;

        info!(endpoint_id = %id, removed_access_rights, "Endpoint deleted");
        Ok(())
    }

    /// Add a user endpoint to a REST service
    pub async fn add_endpoint(&self, service_id: &str, method: &str, path: &str) -> Result<Endpoint, ServerError> {
        if path.is_empty() {
            return Err(ServerError::bad_request(
                "endpoint_path_empty",
                "Endpoint path cannot be empty",
            ));
        }
        let method = normalize_method(method)?;

        let endpoint = self
            .store
            .transaction(|conf| {
                let (mut client, service) = locate_service(conf, service_id)?;

                let is_rest = client
                    .service_descriptions
                    .iter()
                    .find(|sd| sd.services.iter().any(|s| s == &service))
                    .map(|sd| sd.description_type.is_rest_like())
                    .unwrap_or(false);
                if !is_rest {
                    return Err(ServerError::bad_request(
                        "wrong_service_description_type",
                        "Endpoints can only be added to REST services",
                    ));
                }

                let endpoint = Endpoint {
                    id: 0,
                    service_code: service.service_code.clone(),
                    method,
                    path: path.to_string(),
                    generated: false,
                };
                ensure_unique(&client, &endpoint)?;

                let endpoint = Endpoint {
                    id: conf.next_endpoint_id(),
                    ..endpoint
                };
                client.endpoints.push(endpoint.clone());
                conf.save_client(client)?;
                Ok(endpoint)
            })
            .await?;

        info!(endpoint_id = endpoint.id, service_id = %service_id, "Endpoint added");
        Ok(endpoint)
    }

    pub async fn get_access_rights(&self, endpoint_id: &str) -> Result<Vec<AclEntry>, ServerError> {
        self.store
            .read(|conf| {
                let client = conf.get_client_by_endpoint_id(endpoint_id)?;
                let id = parse_id(endpoint_id).unwrap_or_default();
                Ok(client.acl.into_iter().filter(|entry| entry.endpoint_id == id).collect())
            })
            .await
    }

    /// Grant `subject_id` access to an endpoint; granting twice returns the existing entry
    pub async fn add_access_right(&self, endpoint_id: &str, subject_id: &str) -> Result<AclEntry, ServerError> {
        let subject: ClientId = subject_id.parse().map_err(|e: String| {
            ServerError::bad_request("invalid_client_id", e)
        })?;
        let subject = subject.to_string();

        let entry = self
            .store
            .transaction(|conf| {
                let mut client = conf.get_client_by_endpoint_id(endpoint_id)?;
                let id = parse_id(endpoint_id)
                    .ok_or_else(|| ServerError::not_found(ResourceKind::Endpoint, endpoint_id))?;

                if let Some(existing) = client
                    .acl
                    .iter()
                    .find(|entry| entry.endpoint_id == id && entry.subject_id == subject)
                {
                    return Ok(existing.clone());
                }

                let entry = AclEntry {
                    id: conf.next_acl_entry_id(),
                    endpoint_id: id,
                    subject_id: subject.clone(),
                    created_at: Utc::now(),
                };
                client.acl.push(entry.clone());
                conf.save_client(client)?;
                Ok(entry)
            })
            .await?;

        info!(endpoint_id = %endpoint_id, subject_id = %entry.subject_id, "Access right granted");
        Ok(entry)
    }
}
