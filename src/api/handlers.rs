// Request handlers for the admin API

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    Extension,
};

use crate::api::responses::{
    AccessRightDto, AddAccessRightRequest, AddEndpointRequest, AddServiceDescriptionRequest, ApiError, ClientDto,
    DisableRequest, EndpointDto, HealthResponse, OptionalJson, RefreshRequest, ServiceDescriptionDto, ServiceDto,
    UpdateEndpointRequest, UpdateServiceDescriptionRequest,
};
use crate::api::AppState;
use crate::auth::authority::{Authority, Principal};
use crate::core::errors::ServerError;
use crate::core::models::ServiceDescriptionType;
use crate::services::service_description_service::{NewServiceDescription, ServiceDescriptionUpdate};

// Service descriptions

/// GET /api/v1/service-descriptions/:id
pub async fn get_service_description(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> Result<Json<ServiceDescriptionDto>, ApiError> {
    state.gate.require(&principal, Authority::ViewClientServices)?;
    let result = state.service_descriptions.get_service_description(&id).await;
    let view = state.observe("get_service_description", result)?;
    Ok(Json(view.into()))
}

/// GET /api/v1/service-descriptions/:id/services
pub async fn get_service_description_services(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> Result<Json<Vec<ServiceDto>>, ApiError> {
    state.gate.require(&principal, Authority::ViewClientServices)?;
    let result = state.service_descriptions.get_services(&id).await;
    let (client_id, services) = state.observe("get_services", result)?;
    Ok(Json(
        services
            .iter()
            .map(|service| ServiceDto::new(&client_id, service))
            .collect(),
    ))
}

/// PUT /api/v1/service-descriptions/:id/enable
pub async fn enable_service_description(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.gate.require(&principal, Authority::EnableDisableWsdl)?;
    let result = state.service_descriptions.enable(&id).await;
    state.audited(&principal, "enable_service_description", &id, result)?;
    Ok(StatusCode::NO_CONTENT)
}

/// PUT /api/v1/service-descriptions/:id/disable
pub async fn disable_service_description(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
    OptionalJson(request): OptionalJson<DisableRequest>,
) -> Result<StatusCode, ApiError> {
    state.gate.require(&principal, Authority::EnableDisableWsdl)?;
    let result = state.service_descriptions.disable(&id, request.disabled_notice).await;
    state.audited(&principal, "disable_service_description", &id, result)?;
    Ok(StatusCode::NO_CONTENT)
}

/// PATCH /api/v1/service-descriptions/:id
///
/// WSDL descriptions need `EDIT_WSDL`, REST and OpenAPI ones `EDIT_REST`.
pub async fn update_service_description(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
    Json(request): Json<UpdateServiceDescriptionRequest>,
) -> Result<Json<ServiceDescriptionDto>, ApiError> {
    let authority = match request.description_type {
        ServiceDescriptionType::Wsdl => Authority::EditWsdl,
        ServiceDescriptionType::Rest | ServiceDescriptionType::Openapi3 => Authority::EditRest,
    };
    state.gate.require(&principal, authority)?;

    let update = ServiceDescriptionUpdate {
        url: request.url,
        description_type: request.description_type,
        ignore_warnings: request.ignore_warnings,
        rest_service_code: request.rest_service_code,
        new_rest_service_code: request.new_rest_service_code,
    };
    let result = state.service_descriptions.update(&id, update).await;
    let view = state.audited(&principal, "update_service_description", &id, result)?;
    Ok(Json(view.into()))
}

/// POST /api/v1/service-descriptions/:id/refresh
pub async fn refresh_service_description(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
    OptionalJson(request): OptionalJson<RefreshRequest>,
) -> Result<Json<ServiceDescriptionDto>, ApiError> {
    state.gate.require(&principal, Authority::RefreshWsdl)?;
    let result = state.service_descriptions.refresh(&id, request.ignore_warnings).await;
    let view = state.audited(&principal, "refresh_service_description", &id, result)?;
    Ok(Json(view.into()))
}

/// DELETE /api/v1/service-descriptions/:id
pub async fn delete_service_description(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.gate.require(&principal, Authority::DeleteWsdl)?;
    let result = state.service_descriptions.delete(&id).await;
    state.audited(&principal, "delete_service_description", &id, result)?;
    Ok(StatusCode::NO_CONTENT)
}

// Clients

/// GET /api/v1/clients/:id
pub async fn get_client(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> Result<Json<ClientDto>, ApiError> {
    state.gate.require(&principal, Authority::ViewClientDetails)?;
    let result = state.clients.get_client(&id).await;
    let client = state.observe("get_client", result)?;
    Ok(Json(ClientDto::from(&client)))
}

/// GET /api/v1/clients/:id/service-descriptions
pub async fn get_client_service_descriptions(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> Result<Json<Vec<ServiceDescriptionDto>>, ApiError> {
    state.gate.require(&principal, Authority::ViewClientServices)?;
    let result = state.clients.get_client_service_descriptions(&id).await;
    let (client_id, descriptions) = state.observe("get_client_service_descriptions", result)?;
    Ok(Json(
        descriptions
            .iter()
            .map(|sd| ServiceDescriptionDto::new(&client_id, sd))
            .collect(),
    ))
}

/// POST /api/v1/clients/:id/service-descriptions
pub async fn add_client_service_description(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
    Json(request): Json<AddServiceDescriptionRequest>,
) -> Result<Response, ApiError> {
    let new_description = match request.description_type {
        ServiceDescriptionType::Wsdl => {
            state.gate.require(&principal, Authority::AddWsdl)?;
            NewServiceDescription::Wsdl {
                url: request.url,
                ignore_warnings: request.ignore_warnings,
            }
        }
        description_type => {
            state.gate.require(&principal, Authority::AddOpenapi3)?;
            let service_code = request.rest_service_code.ok_or_else(|| {
                ServerError::bad_request("invalid_rest_service_code", "rest_service_code is required")
            })?;
            NewServiceDescription::Rest {
                url: request.url,
                description_type,
                service_code,
            }
        }
    };

    let result = state.service_descriptions.add(&id, new_description).await;
    let view = state.audited(&principal, "add_service_description", &id, result)?;
    let location = format!("/api/v1/service-descriptions/{}", view.description.id);
    let dto: ServiceDescriptionDto = view.into();
    Ok((StatusCode::CREATED, [(header::LOCATION, location)], Json(dto)).into_response())
}

// Endpoints

/// POST /api/v1/services/:id/endpoints
pub async fn add_endpoint(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(service_id): Path<String>,
    Json(request): Json<AddEndpointRequest>,
) -> Result<(StatusCode, Json<EndpointDto>), ApiError> {
    state.gate.require(&principal, Authority::AddOpenapi3Endpoint)?;
    let result = state
        .endpoints
        .add_endpoint(&service_id, &request.method, &request.path)
        .await;
    let endpoint = state.audited(&principal, "add_endpoint", &service_id, result)?;
    Ok((StatusCode::CREATED, Json(endpoint.into())))
}

/// GET /api/v1/endpoints/:id
pub async fn get_endpoint(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> Result<Json<EndpointDto>, ApiError> {
    state.gate.require(&principal, Authority::ViewEndpoint)?;
    let result = state.endpoints.get_endpoint(&id).await;
    let endpoint = state.observe("get_endpoint", result)?;
    Ok(Json(endpoint.into()))
}

/// PATCH /api/v1/endpoints/:id
pub async fn update_endpoint(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
    Json(request): Json<UpdateEndpointRequest>,
) -> Result<Json<EndpointDto>, ApiError> {
    state.gate.require(&principal, Authority::EditOpenapi3Endpoint)?;
    let result = state
        .endpoints
        .update_endpoint(&id, request.method.as_deref(), request.path.as_deref())
        .await;
    let endpoint = state.audited(&principal, "update_endpoint", &id, result)?;
    Ok(Json(endpoint.into()))
}

/// DELETE /api/v1/endpoints/:id
pub async fn delete_endpoint(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.gate.require(&principal, Authority::DeleteEndpoint)?;
    let result = state.endpoints.delete_endpoint(&id).await;
    state.audited(&principal, "delete_endpoint", &id, result)?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/endpoints/:id/access-rights
pub async fn get_endpoint_access_rights(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> Result<Json<Vec<AccessRightDto>>, ApiError> {
    state.gate.require(&principal, Authority::ViewEndpointAcl)?;
    let result = state.endpoints.get_access_rights(&id).await;
    let entries = state.observe("get_access_rights", result)?;
    Ok(Json(entries.into_iter().map(AccessRightDto::from).collect()))
}

/// POST /api/v1/endpoints/:id/access-rights
pub async fn add_endpoint_access_right(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
    Json(request): Json<AddAccessRightRequest>,
) -> Result<(StatusCode, Json<AccessRightDto>), ApiError> {
    state.gate.require(&principal, Authority::EditEndpointAcl)?;
    let result = state.endpoints.add_access_right(&id, &request.subject_id).await;
    let entry = state.audited(&principal, "add_access_right", &id, result)?;
    Ok((StatusCode::CREATED, Json(entry.into())))
}

// System

/// GET /health
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let clients = state.store.read(|conf| conf.clients.len()).await;
    Json(HealthResponse {
        status: "healthy".to_string(),
        clients,
        global_conf_valid: state.global_conf.verify_validity().is_ok(),
    })
}

/// GET /metrics
///
/// Prometheus text exposition format
pub async fn metrics_handler(State(state): State<AppState>) -> Result<Response, ApiError> {
    let body = state.metrics.encode()?;
    Ok((
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        body,
    )
        .into_response())
}
