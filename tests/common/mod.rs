// Common test utilities and fixtures shared by the unit and integration suites

#![allow(dead_code)]

use async_trait::async_trait;
use axum::Router;
use chrono::{DateTime, Duration, TimeZone, Utc};
use security_server::api::{create_admin_router, AppState};
use security_server::auth::api_key::ApiKeyHash;
use security_server::auth::audit_logger::AuditLogger;
use security_server::auth::auth_middleware::AuthState;
use security_server::auth::authority::{Authority, GrantedAuthorityGate, Principal};
use security_server::auth::principal_store::PrincipalStore;
use security_server::config::Config;
use security_server::core::crypto::{AuthKey, CertChain};
use security_server::core::errors::WsdlError;
use security_server::core::models::{
    AclEntry, Client, ClientId, Endpoint, Service, ServiceDescription, ServiceDescriptionType,
};
use security_server::metrics::Metrics;
use security_server::services::client_service::ClientService;
use security_server::services::endpoint_service::EndpointService;
use security_server::services::service_description_service::ServiceDescriptionService;
use security_server::state::global_conf::{FileGlobalConf, GlobalConfSnapshot};
use security_server::state::key_conf::FileKeyConf;
use security_server::state::serverconf::ServerConf;
use security_server::state::store::ServerConfStore;
use security_server::wsdl::{
    DefaultWsdlUrlValidator, HttpWsdlFetcher, NoopWsdlValidator, NormalizedService, WsdlFetcher, WsdlValidator,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

pub const SS1: &str = "FI:GOV:M1:SS1";
pub const SS2: &str = "FI:GOV:M1:SS2";
pub const SUBJECT: &str = "FI:GOV:M2:CLIENT";

pub const SD1_URL: &str = "https://soapservice.com/v1/Endpoint?wsdl";
pub const SD2_URL: &str = "https://soapservice.com/v2/Endpoint?wsdl";
pub const SD4_URL: &str = "https://restservice.com/api/v1";
pub const REST_SERVICE_CODE: &str = "rest-servicecode";

pub const ADMIN_KEY: &str = "admin-api-key";
pub const VIEWER_KEY: &str = "viewer-api-key";

/// `file:` URL of the test WSDL publishing `xroadGetRandom.v1` and `bodyMassIndex.v1`
pub fn testservice_url() -> String {
    format!("file:{}/tests/resources/testservice.wsdl", env!("CARGO_MANIFEST_DIR"))
}

pub fn initial_refreshed_at() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
}

pub fn service(code: &str, version: Option<&str>, url: &str) -> Service {
    Service {
        service_code: code.to_string(),
        service_version: version.map(str::to_string),
        title: None,
        url: url.to_string(),
        timeout: 60,
        ssl_auth: url.starts_with("https"),
    }
}

fn description(
    id: u64,
    url: &str,
    description_type: ServiceDescriptionType,
    disabled: bool,
    notice: &str,
    services: Vec<Service>,
) -> ServiceDescription {
    ServiceDescription {
        id,
        url: url.to_string(),
        description_type,
        disabled,
        disabled_notice: notice.to_string(),
        refreshed_at: initial_refreshed_at(),
        services,
    }
}

fn user_endpoint(id: u64, service_code: &str, method: &str, path: &str) -> Endpoint {
    Endpoint {
        id,
        service_code: service_code.to_string(),
        method: method.to_string(),
        path: path.to_string(),
        generated: false,
    }
}

fn acl(id: u64, endpoint_id: u64, subject: &str) -> AclEntry {
    AclEntry {
        id,
        endpoint_id,
        subject_id: subject.to_string(),
        created_at: initial_refreshed_at(),
    }
}

/// Two subsystems of member `FI:GOV:M1`.
///
/// `SS1` owns descriptions 1 (WSDL, enabled), 2 (WSDL, disabled "Kaputt")
/// and 4 (REST); `SS2` owns description 3 (WSDL).
pub fn fixture_conf() -> ServerConf {
    let soap_url = "https://soapservice.com/v1/Endpoint";

    let mut ss1 = Client::new(SS1.parse().unwrap());
    ss1.service_descriptions = vec![
        description(
            1,
            SD1_URL,
            ServiceDescriptionType::Wsdl,
            false,
            "Out of order",
            vec![
                service("getRandom", Some("v1"), soap_url),
                service("calculatePrime", Some("v1"), soap_url),
                service("helloService", Some("v1"), soap_url),
            ],
        ),
        description(
            2,
            SD2_URL,
            ServiceDescriptionType::Wsdl,
            true,
            "Kaputt",
            vec![service("sayHello", Some("v1"), "https://soapservice.com/v2/Endpoint")],
        ),
        description(
            4,
            SD4_URL,
            ServiceDescriptionType::Rest,
            true,
            "Out of order",
            vec![service(REST_SERVICE_CODE, None, SD4_URL)],
        ),
    ];
    ss1.endpoints = vec![
        Endpoint::base(1, "getRandom"),
        user_endpoint(2, "getRandom", "GET", "/api/random"),
        Endpoint::base(3, "calculatePrime"),
        Endpoint::base(4, "helloService"),
        Endpoint::base(5, "sayHello"),
        Endpoint::base(6, REST_SERVICE_CODE),
        user_endpoint(7, REST_SERVICE_CODE, "POST", "/pets"),
    ];
    ss1.acl = vec![
        acl(1, 1, SUBJECT),
        acl(2, 2, SUBJECT),
        acl(3, 3, "FI:COM:M3"),
        acl(4, 7, SUBJECT),
    ];

    let mut ss2 = Client::new(SS2.parse().unwrap());
    let old_url = "http://localhost:8086/test-service";
    ss2.service_descriptions = vec![description(
        3,
        &testservice_url(),
        ServiceDescriptionType::Wsdl,
        false,
        "",
        vec![
            service("xroadGetRandomOld", Some("v1"), old_url),
            service("bodyMassIndexOld", Some("v1"), old_url),
        ],
    )];
    ss2.endpoints = vec![
        Endpoint::base(8, "xroadGetRandomOld"),
        Endpoint::base(9, "bodyMassIndexOld"),
    ];
    ss2.acl = vec![acl(5, 8, SS1)];

    ServerConf::new(vec![ss1, ss2])
}

pub fn fixture_store() -> Arc<ServerConfStore> {
    Arc::new(ServerConfStore::new(fixture_conf()))
}

pub fn client_id(raw: &str) -> ClientId {
    raw.parse().unwrap()
}

/// The services published by `tests/resources/testservice.wsdl`
pub fn testservice_services() -> Vec<NormalizedService> {
    ["xroadGetRandom", "bodyMassIndex"]
        .into_iter()
        .map(|code| NormalizedService {
            service_code: code.to_string(),
            service_version: Some("v1".to_string()),
            title: None,
            url: "http://localhost:8086/test-service".to_string(),
            timeout: 60,
            ssl_auth: false,
        })
        .collect()
}

/// Fetcher answering from a fixed URL table and counting calls
#[derive(Default)]
pub struct StaticWsdlFetcher {
    documents: HashMap<String, Vec<NormalizedService>>,
    calls: AtomicUsize,
}

impl StaticWsdlFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, url: &str, services: Vec<NormalizedService>) -> Self {
        self.documents.insert(url.to_string(), services);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WsdlFetcher for StaticWsdlFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<NormalizedService>, WsdlError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.documents
            .get(url)
            .cloned()
            .ok_or_else(|| WsdlError::DownloadFailed {
                url: url.to_string(),
                reason: "connection refused".to_string(),
            })
    }
}

/// Validator returning a fixed warning list
pub struct StaticWsdlValidator(pub Vec<String>);

#[async_trait]
impl WsdlValidator for StaticWsdlValidator {
    async fn validate(&self, _url: &str) -> Result<Vec<String>, WsdlError> {
        Ok(self.0.clone())
    }
}

/// Service description service reading WSDL files from disk
pub fn file_backed_service(store: Arc<ServerConfStore>) -> ServiceDescriptionService {
    ServiceDescriptionService::new(
        store,
        Arc::new(HttpWsdlFetcher::new(std::time::Duration::from_secs(5)).unwrap()),
        Arc::new(DefaultWsdlUrlValidator),
        Arc::new(NoopWsdlValidator),
    )
}

pub fn static_service(
    store: Arc<ServerConfStore>,
    fetcher: Arc<StaticWsdlFetcher>,
    validator: Arc<dyn WsdlValidator>,
) -> ServiceDescriptionService {
    ServiceDescriptionService::new(store, fetcher, Arc::new(DefaultWsdlUrlValidator), validator)
}

pub fn valid_global_conf() -> FileGlobalConf {
    FileGlobalConf::from_snapshot(Some(GlobalConfSnapshot {
        instance_identifier: "FI".to_string(),
        expires_at: Utc::now() + Duration::hours(1),
    }))
}

pub fn expired_global_conf() -> FileGlobalConf {
    FileGlobalConf::from_snapshot(Some(GlobalConfSnapshot {
        instance_identifier: "FI".to_string(),
        expires_at: Utc::now() - Duration::hours(1),
    }))
}

pub fn key_conf_with_chain() -> FileKeyConf {
    FileKeyConf::from_auth_key(AuthKey::new(
        Some(CertChain::from_der(vec![vec![0x30, 0x82, 0x01, 0x0a]])),
        None,
    ))
}

pub fn key_conf_with_empty_chain() -> FileKeyConf {
    FileKeyConf::from_auth_key(AuthKey::new(Some(CertChain::from_der(Vec::new())), None))
}

pub fn principals() -> PrincipalStore {
    PrincipalStore::new(vec![
        (
            ApiKeyHash::from_api_key(ADMIN_KEY),
            Principal::new("admin", Authority::ALL),
        ),
        (
            ApiKeyHash::from_api_key(VIEWER_KEY),
            Principal::new(
                "viewer",
                [
                    Authority::ViewClientDetails,
                    Authority::ViewClientServices,
                    Authority::ViewEndpoint,
                    Authority::ViewEndpointAcl,
                ],
            ),
        ),
    ])
}

pub struct TestApp {
    pub router: Router,
    pub store: Arc<ServerConfStore>,
    pub fetcher: Arc<StaticWsdlFetcher>,
    pub metrics: Arc<Metrics>,
}

/// Admin router over the fixture store; the fetcher serves `testservice_url()`
/// and `SD1_URL`
pub fn test_app() -> TestApp {
    let fetcher = Arc::new(
        StaticWsdlFetcher::new()
            .with(&testservice_url(), testservice_services())
            .with(SD1_URL, testservice_services()),
    );
    test_app_with(fetcher, Arc::new(NoopWsdlValidator))
}

pub fn test_app_with(fetcher: Arc<StaticWsdlFetcher>, validator: Arc<dyn WsdlValidator>) -> TestApp {
    let store = fixture_store();
    let audit_logger = Arc::new(AuditLogger::new());
    let metrics = Arc::new(Metrics::new().unwrap());

    let app_state = AppState {
        store: store.clone(),
        service_descriptions: Arc::new(static_service(store.clone(), fetcher.clone(), validator)),
        endpoints: Arc::new(EndpointService::new(store.clone())),
        clients: Arc::new(ClientService::new(store.clone())),
        gate: Arc::new(GrantedAuthorityGate::new(audit_logger.clone())),
        global_conf: Arc::new(valid_global_conf()),
        audit_logger: audit_logger.clone(),
        metrics: metrics.clone(),
        config: Arc::new(Config::test_config()),
    };
    let auth_state = Arc::new(AuthState {
        principals: Arc::new(principals()),
        audit_logger,
    });

    TestApp {
        router: create_admin_router(app_state, auth_state),
        store,
        fetcher,
        metrics,
    }
}
