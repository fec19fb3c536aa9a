// Request and response bodies of the admin API

use crate::core::errors::{ErrorDeviation, ServerError};
use crate::core::models::{AclEntry, Client, ClientId, Endpoint, Service, ServiceDescription, ServiceDescriptionType, Warning};
use crate::services::service_description_service::ServiceDescriptionView;
use axum::{
    body::Bytes,
    extract::{FromRequest, Request},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::error;

/// Error response structure
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub status: u16,
    pub message: String,
    pub error: ErrorDeviation,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<Warning>,
}

/// API error type that converts domain errors to HTTP responses
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
    pub deviation: ErrorDeviation,
    pub warnings: Vec<Warning>,
}

impl ApiError {
    pub fn from_server_error(err: ServerError) -> Self {
        let status = StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            error!(error = %err, "Admin request failed");
        }
        Self {
            status,
            message: err.user_message(),
            deviation: err.deviation(),
            warnings: err.warnings().to_vec(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorResponse {
            status: self.status.as_u16(),
            message: self.message,
            error: self.deviation,
            warnings: self.warnings,
        });
        (self.status, body).into_response()
    }
}

impl From<ServerError> for ApiError {
    fn from(err: ServerError) -> Self {
        ApiError::from_server_error(err)
    }
}

/// JSON body that may be left out entirely.
///
/// An empty (or all-whitespace) body yields `T::default()`. Anything else must
/// parse as `T`, otherwise the request fails with `invalid_request_body`.
#[derive(Debug, Default)]
pub struct OptionalJson<T>(pub T);

#[axum::async_trait]
impl<T, S> FromRequest<S> for OptionalJson<T>
where
    T: DeserializeOwned + Default,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(IntoResponse::into_response)?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self(T::default()));
        }
        match Json::<T>::from_bytes(&bytes) {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => Err(ApiError::from(ServerError::bad_request(
                "invalid_request_body",
                rejection.body_text(),
            ))
            .into_response()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub clients: usize,
    pub global_conf_valid: bool,
}

#[derive(Debug, Serialize)]
pub struct ServiceDto {
    /// `{client_id}:{full_service_code}`
    pub id: String,
    pub service_code: String,
    pub full_service_code: String,
    pub title: Option<String>,
    pub url: String,
    pub timeout: u32,
    pub ssl_auth: bool,
}

impl ServiceDto {
    pub fn new(client_id: &ClientId, service: &Service) -> Self {
        let full_service_code = service.full_service_code();
        Self {
            id: format!("{}:{}", client_id, full_service_code),
            service_code: service.service_code.clone(),
            full_service_code,
            title: service.title.clone(),
            url: service.url.clone(),
            timeout: service.timeout,
            ssl_auth: service.ssl_auth,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ServiceDescriptionDto {
    pub id: String,
    pub client_id: String,
    pub url: String,
    #[serde(rename = "type")]
    pub description_type: ServiceDescriptionType,
    pub disabled: bool,
    pub disabled_notice: String,
    pub refreshed_at: DateTime<Utc>,
    pub services: Vec<ServiceDto>,
}

impl ServiceDescriptionDto {
    pub fn new(client_id: &ClientId, description: &ServiceDescription) -> Self {
        Self {
            id: description.id.to_string(),
            client_id: client_id.to_string(),
            url: description.url.clone(),
            description_type: description.description_type,
            disabled: description.disabled,
            disabled_notice: description.disabled_notice.clone(),
            refreshed_at: description.refreshed_at,
            services: description
                .services
                .iter()
                .map(|service| ServiceDto::new(client_id, service))
                .collect(),
        }
    }
}

impl From<ServiceDescriptionView> for ServiceDescriptionDto {
    fn from(view: ServiceDescriptionView) -> Self {
        Self::new(&view.client_id, &view.description)
    }
}

#[derive(Debug, Serialize)]
pub struct ClientDto {
    pub id: String,
    pub instance_id: String,
    pub member_class: String,
    pub member_code: String,
    pub subsystem_code: Option<String>,
    pub service_description_count: usize,
}

impl From<&Client> for ClientDto {
    fn from(client: &Client) -> Self {
        Self {
            id: client.id.to_string(),
            instance_id: client.id.instance.clone(),
            member_class: client.id.member_class.clone(),
            member_code: client.id.member_code.clone(),
            subsystem_code: client.id.subsystem_code.clone(),
            service_description_count: client.service_descriptions.len(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct EndpointDto {
    pub id: String,
    pub service_code: String,
    pub method: String,
    pub path: String,
    pub generated: bool,
}

impl From<Endpoint> for EndpointDto {
    fn from(endpoint: Endpoint) -> Self {
        Self {
            id: endpoint.id.to_string(),
            service_code: endpoint.service_code,
            method: endpoint.method,
            path: endpoint.path,
            generated: endpoint.generated,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AccessRightDto {
    pub id: String,
    pub subject_id: String,
    pub created_at: DateTime<Utc>,
}

impl From<AclEntry> for AccessRightDto {
    fn from(entry: AclEntry) -> Self {
        Self {
            id: entry.id.to_string(),
            subject_id: entry.subject_id,
            created_at: entry.created_at,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct DisableRequest {
    #[serde(default)]
    pub disabled_notice: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateServiceDescriptionRequest {
    pub url: String,
    #[serde(rename = "type")]
    pub description_type: ServiceDescriptionType,
    #[serde(default)]
    pub ignore_warnings: bool,
    #[serde(default)]
    pub rest_service_code: Option<String>,
    #[serde(default)]
    pub new_rest_service_code: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RefreshRequest {
    #[serde(default)]
    pub ignore_warnings: bool,
}

#[derive(Debug, Deserialize)]
pub struct AddServiceDescriptionRequest {
    pub url: String,
    #[serde(rename = "type")]
    pub description_type: ServiceDescriptionType,
    #[serde(default)]
    pub ignore_warnings: bool,
    #[serde(default)]
    pub rest_service_code: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AddEndpointRequest {
    pub method: String,
    pub path: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateEndpointRequest {
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AddAccessRightRequest {
    pub subject_id: String,
}
