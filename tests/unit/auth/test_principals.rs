// Unit tests for principal lookup and the authority gate

use crate::common::{principals, ADMIN_KEY, VIEWER_KEY};
use security_server::auth::api_key::ApiKey;
use security_server::auth::audit_logger::AuditLogger;
use security_server::auth::authority::{Authority, AuthorityGate, GrantedAuthorityGate};
use std::sync::Arc;

#[test]
fn test_authenticate_known_keys() {
    let store = principals();
    assert_eq!(store.len(), 2);

    let admin = store.authenticate(&ApiKey::new(ADMIN_KEY)).unwrap();
    assert_eq!(admin.name, "admin");
    assert!(Authority::ALL.iter().all(|a| admin.has(*a)));

    let viewer = store.authenticate(&ApiKey::new(VIEWER_KEY)).unwrap();
    assert!(viewer.has(Authority::ViewEndpoint));
    assert!(!viewer.has(Authority::EnableDisableWsdl));
}

#[test]
fn test_authenticate_unknown_key() {
    assert!(principals().authenticate(&ApiKey::new("nope")).is_none());
}

#[test]
fn test_gate_denies_missing_authority() {
    let gate = GrantedAuthorityGate::new(Arc::new(AuditLogger::new()));
    let viewer = principals().authenticate(&ApiKey::new(VIEWER_KEY)).unwrap();

    assert!(gate.require(&viewer, Authority::ViewClientServices).is_ok());

    let err = gate.require(&viewer, Authority::RefreshWsdl).unwrap_err();
    assert_eq!(err.status_code(), 403);
    assert_eq!(err.deviation().code, "access_denied");
    assert_eq!(err.deviation().metadata, vec!["REFRESH_WSDL".to_string()]);
}
