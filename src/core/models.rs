// Domain model - clients, service descriptions, services, endpoints and access rights

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Method wildcard used by base endpoints
pub const ANY_METHOD: &str = "*";

/// Path wildcard used by base endpoints
pub const ANY_PATH: &str = "**";

/// Timeout (seconds) assigned to services discovered from a WSDL or REST definition
pub const DEFAULT_SERVICE_TIMEOUT: u32 = 60;

/// Parse a numeric resource identifier.
///
/// Anything that is not a plain unsigned integer yields `None`, which callers
/// report as "not found" rather than as a malformed request.
pub fn parse_id(raw: &str) -> Option<u64> {
    raw.trim().parse::<u64>().ok()
}

/// Identifier of a member or subsystem: `INSTANCE:CLASS:CODE[:SUBSYSTEM]`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ClientId {
    pub instance: String,
    pub member_class: String,
    pub member_code: String,
    pub subsystem_code: Option<String>,
}

impl ClientId {
    pub fn subsystem(instance: &str, member_class: &str, member_code: &str, subsystem: &str) -> Self {
        Self {
            instance: instance.to_string(),
            member_class: member_class.to_string(),
            member_code: member_code.to_string(),
            subsystem_code: Some(subsystem.to_string()),
        }
    }

    /// Parse an identifier whose parts are joined with `separator`
    pub fn parse_with(raw: &str, separator: char) -> Result<Self, String> {
        let parts: Vec<&str> = raw.split(separator).collect();
        if !(3..=4).contains(&parts.len()) || parts.iter().any(|p| p.trim().is_empty()) {
            return Err(format!("Invalid client identifier: '{}'", raw));
        }

        Ok(Self {
            instance: parts[0].to_string(),
            member_class: parts[1].to_string(),
            member_code: parts[2].to_string(),
            subsystem_code: parts.get(3).map(|s| s.to_string()),
        })
    }
}

impl FromStr for ClientId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_with(s, ':')
    }
}

impl TryFrom<String> for ClientId {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ClientId> for String {
    fn from(value: ClientId) -> Self {
        value.to_string()
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.instance, self.member_class, self.member_code)?;
        if let Some(subsystem) = &self.subsystem_code {
            write!(f, ":{}", subsystem)?;
        }
        Ok(())
    }
}

/// Split an encoded service id `<client-id>:<full-service-code>`
pub fn parse_service_id(raw: &str) -> Option<(ClientId, String)> {
    let (client, full_code) = raw.rsplit_once(':')?;
    if full_code.is_empty() {
        return None;
    }
    let client_id = client.parse::<ClientId>().ok()?;
    Some((client_id, full_code.to_string()))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServiceDescriptionType {
    Wsdl,
    Openapi3,
    Rest,
}

impl ServiceDescriptionType {
    pub fn is_rest_like(&self) -> bool {
        matches!(self, Self::Openapi3 | Self::Rest)
    }
}

impl fmt::Display for ServiceDescriptionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Wsdl => "WSDL",
            Self::Openapi3 => "OPENAPI3",
            Self::Rest => "REST",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    pub service_code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub url: String,
    #[serde(default = "default_timeout")]
    pub timeout: u32,
    #[serde(default)]
    pub ssl_auth: bool,
}

fn default_timeout() -> u32 {
    DEFAULT_SERVICE_TIMEOUT
}

impl Service {
    /// Service code with the version appended, e.g. `getRandom.v1`
    pub fn full_service_code(&self) -> String {
        match &self.service_version {
            Some(version) if !version.is_empty() => format!("{}.{}", self.service_code, version),
            _ => self.service_code.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceDescription {
    pub id: u64,
    pub url: String,
    #[serde(rename = "type")]
    pub description_type: ServiceDescriptionType,
    pub disabled: bool,
    #[serde(default)]
    pub disabled_notice: String,
    pub refreshed_at: DateTime<Utc>,
    #[serde(default)]
    pub services: Vec<Service>,
}

impl ServiceDescription {
    pub fn service_codes(&self) -> BTreeSet<String> {
        self.services.iter().map(|s| s.service_code.clone()).collect()
    }

    pub fn full_service_codes(&self) -> BTreeSet<String> {
        self.services.iter().map(Service::full_service_code).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    pub id: u64,
    pub service_code: String,
    pub method: String,
    pub path: String,
    pub generated: bool,
}

impl Endpoint {
    /// The generated catch-all endpoint of a service code
    pub fn base(id: u64, service_code: &str) -> Self {
        Self {
            id,
            service_code: service_code.to_string(),
            method: ANY_METHOD.to_string(),
            path: ANY_PATH.to_string(),
            generated: true,
        }
    }

    pub fn is_base_endpoint(&self) -> bool {
        self.method == ANY_METHOD && self.path == ANY_PATH
    }

    pub fn matches(&self, service_code: &str, method: &str, path: &str) -> bool {
        self.service_code == service_code && self.method == method && self.path == path
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AclEntry {
    pub id: u64,
    pub endpoint_id: u64,
    pub subject_id: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Client {
    pub id: ClientId,
    #[serde(default)]
    pub service_descriptions: Vec<ServiceDescription>,
    #[serde(default)]
    pub endpoints: Vec<Endpoint>,
    #[serde(default)]
    pub acl: Vec<AclEntry>,
}

impl Client {
    pub fn new(id: ClientId) -> Self {
        Self {
            id,
            service_descriptions: Vec::new(),
            endpoints: Vec::new(),
            acl: Vec::new(),
        }
    }

    pub fn services(&self) -> impl Iterator<Item = &Service> {
        self.service_descriptions.iter().flat_map(|sd| sd.services.iter())
    }

    /// Distinct (unversioned) service codes across all descriptions
    pub fn service_codes(&self) -> BTreeSet<String> {
        self.services().map(|s| s.service_code.clone()).collect()
    }

    pub fn find_service(&self, full_service_code: &str) -> Option<&Service> {
        self.services().find(|s| s.full_service_code() == full_service_code)
    }

    pub fn service_description(&self, id: u64) -> Option<&ServiceDescription> {
        self.service_descriptions.iter().find(|sd| sd.id == id)
    }

    pub fn service_description_mut(&mut self, id: u64) -> Option<&mut ServiceDescription> {
        self.service_descriptions.iter_mut().find(|sd| sd.id == id)
    }

    pub fn endpoint(&self, id: u64) -> Option<&Endpoint> {
        self.endpoints.iter().find(|e| e.id == id)
    }

    pub fn endpoint_mut(&mut self, id: u64) -> Option<&mut Endpoint> {
        self.endpoints.iter_mut().find(|e| e.id == id)
    }

    /// Drop the given endpoints together with every ACL entry pointing at them.
    /// Returns the number of ACL entries removed.
    pub fn remove_endpoints(&mut self, endpoint_ids: &BTreeSet<u64>) -> usize {
        let acl_before = self.acl.len();
        self.acl.retain(|entry| !endpoint_ids.contains(&entry.endpoint_id));
        self.endpoints.retain(|e| !endpoint_ids.contains(&e.id));
        acl_before - self.acl.len()
    }
}

/// Non-fatal finding attached to a mutation; blocks it unless warnings are ignored
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Warning {
    pub code: String,
    #[serde(default)]
    pub metadata: Vec<String>,
}

impl Warning {
    pub const ADDING_SERVICES: &'static str = "adding_services";
    pub const REMOVING_SERVICES: &'static str = "removing_services";
    pub const WSDL_VALIDATION_WARNINGS: &'static str = "wsdl_validation_warnings";

    pub fn new(code: &str, metadata: Vec<String>) -> Self {
        Self {
            code: code.to_string(),
            metadata,
        }
    }
}
