// Admin principals, granted authorities and the authority gate

use crate::auth::audit_logger::{AuditEvent, AuditLogger};
use crate::core::errors::ServerError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

/// Permission required by an admin operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Authority {
    ViewClientDetails,
    ViewClientServices,
    EnableDisableWsdl,
    EditWsdl,
    EditRest,
    DeleteWsdl,
    RefreshWsdl,
    AddWsdl,
    AddOpenapi3,
    AddOpenapi3Endpoint,
    ViewEndpoint,
    EditOpenapi3Endpoint,
    DeleteEndpoint,
    ViewEndpointAcl,
    EditEndpointAcl,
}

impl Authority {
    pub const ALL: [Authority; 15] = [
        Authority::ViewClientDetails,
        Authority::ViewClientServices,
        Authority::EnableDisableWsdl,
        Authority::EditWsdl,
        Authority::EditRest,
        Authority::DeleteWsdl,
        Authority::RefreshWsdl,
        Authority::AddWsdl,
        Authority::AddOpenapi3,
        Authority::AddOpenapi3Endpoint,
        Authority::ViewEndpoint,
        Authority::EditOpenapi3Endpoint,
        Authority::DeleteEndpoint,
        Authority::ViewEndpointAcl,
        Authority::EditEndpointAcl,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ViewClientDetails => "VIEW_CLIENT_DETAILS",
            Self::ViewClientServices => "VIEW_CLIENT_SERVICES",
            Self::EnableDisableWsdl => "ENABLE_DISABLE_WSDL",
            Self::EditWsdl => "EDIT_WSDL",
            Self::EditRest => "EDIT_REST",
            Self::DeleteWsdl => "DELETE_WSDL",
            Self::RefreshWsdl => "REFRESH_WSDL",
            Self::AddWsdl => "ADD_WSDL",
            Self::AddOpenapi3 => "ADD_OPENAPI3",
            Self::AddOpenapi3Endpoint => "ADD_OPENAPI3_ENDPOINT",
            Self::ViewEndpoint => "VIEW_ENDPOINT",
            Self::EditOpenapi3Endpoint => "EDIT_OPENAPI3_ENDPOINT",
            Self::DeleteEndpoint => "DELETE_ENDPOINT",
            Self::ViewEndpointAcl => "VIEW_ENDPOINT_ACL",
            Self::EditEndpointAcl => "EDIT_ENDPOINT_ACL",
        }
    }
}

impl fmt::Display for Authority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Authenticated admin API caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub name: String,
    pub authorities: BTreeSet<Authority>,
}

impl Principal {
    pub fn new(name: &str, authorities: impl IntoIterator<Item = Authority>) -> Self {
        Self {
            name: name.to_string(),
            authorities: authorities.into_iter().collect(),
        }
    }

    pub fn has(&self, authority: Authority) -> bool {
        self.authorities.contains(&authority)
    }
}

/// Authorization check performed at the top of every admin handler
pub trait AuthorityGate: Send + Sync {
    fn require(&self, principal: &Principal, authority: Authority) -> Result<(), ServerError>;
}

/// Grants access when the principal carries the authority; denials are audited
pub struct GrantedAuthorityGate {
    audit_logger: Arc<AuditLogger>,
}

impl GrantedAuthorityGate {
    pub fn new(audit_logger: Arc<AuditLogger>) -> Self {
        Self { audit_logger }
    }
}

impl AuthorityGate for GrantedAuthorityGate {
    fn require(&self, principal: &Principal, authority: Authority) -> Result<(), ServerError> {
        if principal.has(authority) {
            return Ok(());
        }

        self.audit_logger.log(AuditEvent::AccessDenied {
            principal: principal.name.clone(),
            authority: authority.as_str().to_string(),
        });
        Err(ServerError::AccessDenied(authority.as_str().to_string()))
    }
}
