// Unit tests for server configuration and principal loading

use crate::common::{fixture_conf, SS1};
use security_server::auth::api_key::{ApiKey, ApiKeyHash};
use security_server::auth::authority::Authority;
use security_server::loader::principal_loader::PrincipalLoader;
use security_server::loader::serverconf_loader::ServerConfLoader;
use std::io::Write;
use tempfile::NamedTempFile;

#[test]
fn test_written_conf_loads_back() {
    let conf = fixture_conf();
    let yaml = serde_yaml::to_string(&conf).unwrap();

    let loaded = ServerConfLoader::from_yaml_str(&yaml).unwrap();
    assert_eq!(loaded, conf);
}

#[test]
fn test_sequences_follow_highest_ids() {
    let yaml = r#"
clients:
  - id: "FI:GOV:M1:SS1"
    service_descriptions:
      - id: 40
        url: "https://restservice.com/api/v1"
        type: OPENAPI3
        disabled: false
        refreshed_at: "2024-01-01T00:00:00Z"
        services:
          - service_code: "petstore"
            url: "https://restservice.com/api/v1"
    endpoints:
      - id: 70
        service_code: "petstore"
        method: "*"
        path: "**"
        generated: true
    acl:
      - id: 3
        endpoint_id: 70
        subject_id: "FI:GOV:M2:CLIENT"
        created_at: "2024-01-01T00:00:00Z"
"#;
    let conf = ServerConfLoader::from_yaml_str(yaml).unwrap();
    assert_eq!(conf.sequences.service_description, 40);
    assert_eq!(conf.sequences.endpoint, 70);
    assert_eq!(conf.sequences.acl_entry, 3);

    let client = conf.client(&SS1.parse().unwrap()).unwrap();
    assert_eq!(client.service_descriptions[0].disabled_notice, "");
    assert_eq!(client.service_descriptions[0].services[0].timeout, 60);
}

#[test]
fn test_missing_base_endpoint_is_rejected() {
    let yaml = r#"
clients:
  - id: "FI:GOV:M1:SS1"
    service_descriptions:
      - id: 1
        url: "https://restservice.com/api/v1"
        type: REST
        disabled: false
        refreshed_at: "2024-01-01T00:00:00Z"
        services:
          - service_code: "petstore"
            url: "https://restservice.com/api/v1"
"#;
    let err = ServerConfLoader::from_yaml_str(yaml).unwrap_err();
    assert!(err.to_string().contains("base endpoints"));
}

#[test]
fn test_dangling_access_right_is_rejected() {
    let yaml = r#"
clients:
  - id: "FI:GOV:M1:SS1"
    acl:
      - id: 1
        endpoint_id: 99
        subject_id: "FI:GOV:M2:CLIENT"
        created_at: "2024-01-01T00:00:00Z"
"#;
    assert!(ServerConfLoader::from_yaml_str(yaml).is_err());
}

#[test]
fn test_missing_file() {
    assert!(ServerConfLoader::from_file("/nonexistent/serverconf.yaml").is_err());
}

#[test]
fn test_principals_from_file() {
    let hash = ApiKeyHash::from_api_key("ops-key");
    let mut file = NamedTempFile::new().unwrap();
    writeln!(
        file,
        "principals:\n  - name: ops\n    api_key_hash: {}\n    authorities: [REFRESH_WSDL, VIEW_ENDPOINT]",
        hash
    )
    .unwrap();

    let store = PrincipalLoader::from_file(file.path()).unwrap();
    let principal = store.authenticate(&ApiKey::new("ops-key")).unwrap();
    assert_eq!(principal.name, "ops");
    assert!(principal.has(Authority::RefreshWsdl));
    assert!(!principal.has(Authority::DeleteWsdl));
}

#[test]
fn test_duplicate_principal_hash_is_rejected() {
    let hash = ApiKeyHash::from_api_key("k");
    let yaml = format!(
        "principals:\n  - name: a\n    api_key_hash: {0}\n  - name: b\n    api_key_hash: {0}\n",
        hash
    );
    assert!(PrincipalLoader::from_yaml_str(&yaml).is_err());
}
