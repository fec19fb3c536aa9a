// Service description lifecycle: enable, disable, update, refresh, delete and add

use crate::core::errors::{ResourceKind, ServerError, WsdlError};
use crate::core::models::{
    parse_id, Client, ClientId, Service, ServiceDescription, ServiceDescriptionType,
    DEFAULT_SERVICE_TIMEOUT,
};
use crate::services::endpoint_service::reconcile;
use crate::services::warnings::{gate, service_change_warnings};
use crate::state::serverconf::{ServerConf, ServerConfRepository};
use crate::state::store::ServerConfStore;
use crate::wsdl::{NormalizedService, WsdlFetcher, WsdlUrlValidator, WsdlValidator};
use chrono::{DateTime, Duration, Utc};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info};

/// Notice stored on descriptions that are created disabled
pub const DEFAULT_DISABLED_NOTICE: &str = "Out of order";

const MAX_SERVICE_CODE_LEN: usize = 255;

/// A description together with the client that owns it
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceDescriptionView {
    pub client_id: ClientId,
    pub description: ServiceDescription,
}

/// Parameters of `update`
#[derive(Debug, Clone)]
pub struct ServiceDescriptionUpdate {
    pub url: String,
    pub description_type: ServiceDescriptionType,
    pub ignore_warnings: bool,
    pub rest_service_code: Option<String>,
    pub new_rest_service_code: Option<String>,
}

/// Parameters of `add`
#[derive(Debug, Clone)]
pub enum NewServiceDescription {
    Wsdl {
        url: String,
        ignore_warnings: bool,
    },
    Rest {
        url: String,
        description_type: ServiceDescriptionType,
        service_code: String,
    },
}

struct FetchedWsdl {
    services: Vec<NormalizedService>,
    validation_warnings: Vec<String>,
}

/// `max(now, previous + 1ms)` so successive refreshes are strictly ordered
pub fn next_refreshed_at(previous: DateTime<Utc>) -> DateTime<Utc> {
    let now = Utc::now();
    let floor = previous + Duration::milliseconds(1);
    if now > floor {
        now
    } else {
        floor
    }
}

/// Fetched services replace the old set; services that survive keep their timeout and SSL settings
fn merge_services(old: &[Service], fetched: Vec<NormalizedService>) -> Vec<Service> {
    fetched
        .into_iter()
        .map(|n| {
            let full_code = n.full_service_code();
            match old.iter().find(|o| o.full_service_code() == full_code) {
                Some(existing) => Service {
                    service_code: n.service_code,
                    service_version: n.service_version,
                    title: n.title.or_else(|| existing.title.clone()),
                    url: n.url,
                    timeout: existing.timeout,
                    ssl_auth: existing.ssl_auth,
                },
                None => n.into(),
            }
        })
        .collect()
}

fn full_codes(services: &[Service]) -> BTreeSet<String> {
    services.iter().map(Service::full_service_code).collect()
}

fn wrong_type(expected: ServiceDescriptionType, actual: ServiceDescriptionType) -> ServerError {
    ServerError::bad_request(
        "wrong_service_description_type",
        format!("Expected service description of type {}, found {}", expected, actual),
    )
}

fn ensure_url_unique(client: &Client, own_id: Option<u64>, url: &str) -> Result<(), ServerError> {
    if client
        .service_descriptions
        .iter()
        .any(|sd| Some(sd.id) != own_id && sd.url == url)
    {
        return Err(ServerError::Conflict {
            code: "wsdl_exists",
            message: format!("Client {} already has a service description at {}", client.id, url),
            metadata: vec![url.to_string()],
        });
    }
    Ok(())
}

fn ensure_services_unique(
    client: &Client,
    own_id: Option<u64>,
    codes: &BTreeSet<String>,
    full_code: bool,
) -> Result<(), ServerError> {
    let existing: BTreeSet<String> = client
        .service_descriptions
        .iter()
        .filter(|sd| Some(sd.id) != own_id)
        .flat_map(|sd| sd.services.iter())
        .map(|s| if full_code { s.full_service_code() } else { s.service_code.clone() })
        .collect();

    let duplicates: Vec<String> = codes.intersection(&existing).cloned().collect();
    if !duplicates.is_empty() {
        return Err(ServerError::Conflict {
            code: "service_already_exists",
            message: format!("Services already exist for client {}: {}", client.id, duplicates.join(", ")),
            metadata: duplicates,
        });
    }
    Ok(())
}

fn validate_rest_service_code(code: &str) -> Result<(), ServerError> {
    let valid = !code.is_empty()
        && code.len() <= MAX_SERVICE_CODE_LEN
        && !code.chars().any(|c| c.is_whitespace() || matches!(c, ':' | '/' | '\\' | ';' | '%'));
    if valid {
        Ok(())
    } else {
        Err(ServerError::bad_request(
            "invalid_rest_service_code",
            format!("Invalid REST service code: '{}'", code),
        ))
    }
}

fn validate_rest_url(url: &str) -> Result<(), ServerError> {
    match url::Url::parse(url) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => Ok(()),
        _ => Err(ServerError::bad_request(
            "invalid_url",
            format!("Invalid REST service URL: '{}'", url),
        )),
    }
}

fn locate<'a>(client: &'a Client, id: &str) -> Result<&'a ServiceDescription, ServerError> {
    parse_id(id)
        .and_then(|sd_id| client.service_description(sd_id))
        .ok_or_else(|| ServerError::not_found(ResourceKind::ServiceDescription, id))
}

/// Service description operations of the admin API
pub struct ServiceDescriptionService {
    store: Arc<ServerConfStore>,
    fetcher: Arc<dyn WsdlFetcher>,
    url_validator: Arc<dyn WsdlUrlValidator>,
    validator: Arc<dyn WsdlValidator>,
}

impl ServiceDescriptionService {
    pub fn new(
        store: Arc<ServerConfStore>,
        fetcher: Arc<dyn WsdlFetcher>,
        url_validator: Arc<dyn WsdlUrlValidator>,
        validator: Arc<dyn WsdlValidator>,
    ) -> Self {
        Self {
            store,
            fetcher,
            url_validator,
            validator,
        }
    }

    pub async fn get_service_description(&self, id: &str) -> Result<ServiceDescriptionView, ServerError> {
        self.store
            .read(|conf| {
                let client = conf.get_client_by_service_description_id(id)?;
                let description = locate(&client, id)?.clone();
                Ok(ServiceDescriptionView {
                    client_id: client.id,
                    description,
                })
            })
            .await
    }

    /// Services of a description; empty when it publishes none
    pub async fn get_services(&self, id: &str) -> Result<(ClientId, Vec<Service>), ServerError> {
        let view = self.get_service_description(id).await?;
        Ok((view.client_id, view.description.services))
    }

    /// Enable a description; the disabled notice is kept
    pub async fn enable(&self, id: &str) -> Result<(), ServerError> {
        self.store
            .transaction(|conf| {
                let mut sd = conf.get_service_description(id)?;
                sd.disabled = false;
                conf.save_service_description(sd)
            })
            .await?;
        info!(service_description_id = %id, "Service description enabled");
        Ok(())
    }

    /// Disable a description; a missing notice is stored as an empty string
    pub async fn disable(&self, id: &str, notice: Option<String>) -> Result<(), ServerError> {
        self.store
            .transaction(|conf| {
                let mut sd = conf.get_service_description(id)?;
                sd.disabled = true;
                sd.disabled_notice = notice.unwrap_or_default();
                conf.save_service_description(sd)
            })
            .await?;
        info!(service_description_id = %id, "Service description disabled");
        Ok(())
    }

    /// Change URL (and service code for REST) of a description
    pub async fn update(
        &self,
        id: &str,
        update: ServiceDescriptionUpdate,
    ) -> Result<ServiceDescriptionView, ServerError> {
        let current = self.get_service_description(id).await?;
        let stored_type = current.description.description_type;
        if stored_type != update.description_type {
            return Err(wrong_type(stored_type, update.description_type));
        }

        match update.description_type {
            ServiceDescriptionType::Wsdl => self.update_wsdl(id, &update.url, update.ignore_warnings).await,
            ServiceDescriptionType::Rest | ServiceDescriptionType::Openapi3 => self.update_rest(id, &update).await,
        }
    }

    /// Re-read the WSDL from the stored URL
    pub async fn refresh(&self, id: &str, ignore_warnings: bool) -> Result<ServiceDescriptionView, ServerError> {
        let current = self.get_service_description(id).await?;
        let stored_type = current.description.description_type;
        if stored_type != ServiceDescriptionType::Wsdl {
            return Err(wrong_type(ServiceDescriptionType::Wsdl, stored_type));
        }

        let url = current.description.url;
        let fetched = self.fetch_wsdl(&url).await?;
        let view = self
            .store
            .transaction(|conf| Self::apply_wsdl(conf, id, &url, fetched, ignore_warnings))
            .await?;

        info!(
            service_description_id = %id,
            services = view.description.services.len(),
            refreshed_at = %view.description.refreshed_at,
            "Service description refreshed"
        );
        Ok(view)
    }

    /// Remove a description, its services and their endpoints
    pub async fn delete(&self, id: &str) -> Result<(), ServerError> {
        self.store
            .transaction(|conf| {
                let client_id = conf.get_client_by_service_description_id(id)?.id;
                let old_services = conf.get_service_description(id)?.services;
                conf.delete_service_description(id)?;

                let mut client = conf.get_client(&client_id)?;
                let report = reconcile(&mut client, &old_services, &[], &mut || conf.next_endpoint_id());
                debug!(removed_endpoints = ?report.removed_endpoints, "Endpoints removed with service description");

                conf.save_client(client)
            })
            .await?;
        info!(service_description_id = %id, "Service description deleted");
        Ok(())
    }

    /// Create a description for a client; new descriptions start disabled
    pub async fn add(
        &self,
        client_id: &str,
        request: NewServiceDescription,
    ) -> Result<ServiceDescriptionView, ServerError> {
        let client_id: ClientId = client_id
            .parse()
            .map_err(|_| ServerError::not_found(ResourceKind::Client, client_id))?;
        self.store.read(|conf| conf.get_client(&client_id).map(|_| ())).await?;

        let view = match request {
            NewServiceDescription::Wsdl { url, ignore_warnings } => {
                self.add_wsdl(client_id, &url, ignore_warnings).await?
            }
            NewServiceDescription::Rest {
                url,
                description_type,
                service_code,
            } => self.add_rest(client_id, &url, description_type, &service_code).await?,
        };

        info!(
            client_id = %view.client_id,
            service_description_id = view.description.id,
            description_type = %view.description.description_type,
            "Service description added"
        );
        Ok(view)
    }

    async fn fetch_wsdl(&self, url: &str) -> Result<FetchedWsdl, ServerError> {
        if !self.url_validator.is_valid_wsdl_url(url) {
            return Err(WsdlError::InvalidUrl(url.to_string()).into());
        }
        let services = self.fetcher.fetch(url).await?;
        let validation_warnings = self.validator.validate(url).await?;
        Ok(FetchedWsdl {
            services,
            validation_warnings,
        })
    }

    async fn update_wsdl(
        &self,
        id: &str,
        url: &str,
        ignore_warnings: bool,
    ) -> Result<ServiceDescriptionView, ServerError> {
        let fetched = self.fetch_wsdl(url).await?;
        let view = self
            .store
            .transaction(|conf| Self::apply_wsdl(conf, id, url, fetched, ignore_warnings))
            .await?;

        info!(
            service_description_id = %id,
            url = %url,
            services = view.description.services.len(),
            "WSDL service description updated"
        );
        Ok(view)
    }

    /// Replace the service set of a WSDL description inside a transaction
    fn apply_wsdl(
        conf: &mut ServerConf,
        id: &str,
        url: &str,
        fetched: FetchedWsdl,
        ignore_warnings: bool,
    ) -> Result<ServiceDescriptionView, ServerError> {
        let mut client = conf.get_client_by_service_description_id(id)?;
        let current = locate(&client, id)?.clone();
        if current.description_type != ServiceDescriptionType::Wsdl {
            return Err(wrong_type(ServiceDescriptionType::Wsdl, current.description_type));
        }
        ensure_url_unique(&client, Some(current.id), url)?;

        let old_services = current.services.clone();
        let new_services = merge_services(&old_services, fetched.services);
        let old_codes = full_codes(&old_services);
        let new_codes = full_codes(&new_services);
        ensure_services_unique(&client, Some(current.id), &new_codes, true)?;

        let added: BTreeSet<String> = new_codes.difference(&old_codes).cloned().collect();
        let removed: BTreeSet<String> = old_codes.difference(&new_codes).cloned().collect();
        gate(
            service_change_warnings(&added, &removed, fetched.validation_warnings),
            ignore_warnings,
        )
        .into_result()?;

        client
            .service_description_mut(current.id)
            .ok_or_else(|| ServerError::not_found(ResourceKind::ServiceDescription, id))?
            .services = new_services.clone();
        reconcile(&mut client, &old_services, &new_services, &mut || conf.next_endpoint_id());

        // URL and timestamp move only once endpoints and access rights match the new set
        let updated = {
            let sd = client
                .service_description_mut(current.id)
                .ok_or_else(|| ServerError::not_found(ResourceKind::ServiceDescription, id))?;
            sd.url = url.to_string();
            sd.refreshed_at = next_refreshed_at(current.refreshed_at);
            sd.clone()
        };

        let client_id = client.id.clone();
        conf.save_client(client)?;
        Ok(ServiceDescriptionView {
            client_id,
            description: updated,
        })
    }

    async fn update_rest(
        &self,
        id: &str,
        update: &ServiceDescriptionUpdate,
    ) -> Result<ServiceDescriptionView, ServerError> {
        validate_rest_url(&update.url)?;
        if let Some(code) = &update.new_rest_service_code {
            validate_rest_service_code(code)?;
        }

        let view = self
            .store
            .transaction(|conf| {
                let mut client = conf.get_client_by_service_description_id(id)?;
                let current = locate(&client, id)?.clone();
                if current.description_type != update.description_type {
                    return Err(wrong_type(current.description_type, update.description_type));
                }
                ensure_url_unique(&client, Some(current.id), &update.url)?;

                let service = current
                    .services
                    .first()
                    .cloned()
                    .ok_or_else(|| ServerError::not_found(ResourceKind::Service, id))?;
                if let Some(expected) = &update.rest_service_code {
                    if expected != &service.service_code {
                        return Err(ServerError::not_found(ResourceKind::Service, expected.clone()));
                    }
                }

                let old_code = service.service_code.clone();
                let new_code = update
                    .new_rest_service_code
                    .clone()
                    .unwrap_or_else(|| old_code.clone());
                if new_code != old_code {
                    ensure_services_unique(&client, Some(current.id), &BTreeSet::from([new_code.clone()]), false)?;
                    for endpoint in client.endpoints.iter_mut().filter(|e| e.service_code == old_code) {
                        endpoint.service_code = new_code.clone();
                    }
                }

                let updated = {
                    let sd = client
                        .service_description_mut(current.id)
                        .ok_or_else(|| ServerError::not_found(ResourceKind::ServiceDescription, id))?;
                    sd.url = update.url.clone();
                    sd.refreshed_at = next_refreshed_at(current.refreshed_at);
                    for s in sd.services.iter_mut() {
                        s.service_code = new_code.clone();
                        s.url = update.url.clone();
                    }
                    sd.clone()
                };

                let client_id = client.id.clone();
                conf.save_client(client)?;
                Ok(ServiceDescriptionView {
                    client_id,
                    description: updated,
                })
            })
            .await?;

        info!(service_description_id = %id, url = %update.url, "REST service description updated");
        Ok(view)
    }

    async fn add_wsdl(
        &self,
        client_id: ClientId,
        url: &str,
        ignore_warnings: bool,
    ) -> Result<ServiceDescriptionView, ServerError> {
        let fetched = self.fetch_wsdl(url).await?;

        self.store
            .transaction(|conf| {
                let mut client = conf.get_client(&client_id)?;
                ensure_url_unique(&client, None, url)?;

                let services: Vec<Service> = fetched.services.into_iter().map(Service::from).collect();
                ensure_services_unique(&client, None, &full_codes(&services), true)?;

                let warnings = service_change_warnings(&BTreeSet::new(), &BTreeSet::new(), fetched.validation_warnings);
                gate(warnings, ignore_warnings).into_result()?;

                let description = ServiceDescription {
                    id: conf.next_service_description_id(),
                    url: url.to_string(),
                    description_type: ServiceDescriptionType::Wsdl,
                    disabled: true,
                    disabled_notice: DEFAULT_DISABLED_NOTICE.to_string(),
                    refreshed_at: Utc::now(),
                    services: services.clone(),
                };
                client.service_descriptions.push(description.clone());
                reconcile(&mut client, &[], &services, &mut || conf.next_endpoint_id());

                conf.save_client(client)?;
                Ok(ServiceDescriptionView {
                    client_id: client_id.clone(),
                    description,
                })
            })
            .await
    }

    async fn add_rest(
        &self,
        client_id: ClientId,
        url: &str,
        description_type: ServiceDescriptionType,
        service_code: &str,
    ) -> Result<ServiceDescriptionView, ServerError> {
        if !description_type.is_rest_like() {
            return Err(ServerError::bad_request(
                "wrong_service_description_type",
                "WSDL descriptions are added by URL only",
            ));
        }
        validate_rest_url(url)?;
        validate_rest_service_code(service_code)?;

        self.store
            .transaction(|conf| {
                let mut client = conf.get_client(&client_id)?;
                ensure_url_unique(&client, None, url)?;
                ensure_services_unique(&client, None, &BTreeSet::from([service_code.to_string()]), false)?;

                let service = Service {
                    service_code: service_code.to_string(),
                    service_version: None,
                    title: None,
                    url: url.to_string(),
                    timeout: DEFAULT_SERVICE_TIMEOUT,
                    ssl_auth: url.starts_with("https"),
                };
                let description = ServiceDescription {
                    id: conf.next_service_description_id(),
                    url: url.to_string(),
                    description_type,
                    disabled: true,
                    disabled_notice: DEFAULT_DISABLED_NOTICE.to_string(),
                    refreshed_at: Utc::now(),
                    services: vec![service.clone()],
                };
                client.service_descriptions.push(description.clone());
                reconcile(&mut client, &[], &[service], &mut || conf.next_endpoint_id());

                conf.save_client(client)?;
                Ok(ServiceDescriptionView {
                    client_id: client_id.clone(),
                    description,
                })
            })
            .await
    }
}
