// Unit tests for admin API key hashing

use crate::common::{ADMIN_KEY, VIEWER_KEY};
use security_server::auth::api_key::{ApiKey, ApiKeyHash};

#[test]
fn test_fixture_keys_hash_apart() {
    let admin = ApiKeyHash::from_api_key(ADMIN_KEY);
    let viewer = ApiKeyHash::from_api_key(VIEWER_KEY);

    assert_ne!(admin, viewer);
    assert_eq!(admin, ApiKey::new(ADMIN_KEY).hash());
    assert!(admin.as_str().chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
}

#[test]
fn test_stored_hash_is_normalized() {
    let hash = ApiKeyHash::from_api_key(ADMIN_KEY);
    let stored = ApiKeyHash::from_hash_string(&hash.as_str().to_ascii_uppercase()).unwrap();

    assert_eq!(stored, hash);
    assert!(stored.ct_matches(&hash));
}

#[test]
fn test_stored_hash_deserializes_from_yaml() {
    let hash = ApiKeyHash::from_api_key(VIEWER_KEY);
    let parsed: ApiKeyHash = serde_yaml::from_str(&format!("\"{}\"", hash)).unwrap();
    assert_eq!(parsed, hash);

    let short: Result<ApiKeyHash, _> = serde_yaml::from_str("\"deadbeef\"");
    assert!(short.is_err());

    let not_hex: Result<ApiKeyHash, _> = serde_yaml::from_str(&format!("\"{}\"", "g".repeat(64)));
    assert!(not_hex.is_err());
}

#[test]
fn test_wrong_key_does_not_match() {
    let stored = ApiKeyHash::from_api_key(ADMIN_KEY);
    assert!(!ApiKey::new("admin-api-key ").hash().ct_matches(&stored));
    assert!(!ApiKey::new("").hash().ct_matches(&stored));
}

#[test]
fn test_presented_key_never_printed() {
    let api_key = ApiKey::new(ADMIN_KEY);
    assert!(!format!("{:?}", api_key).contains(ADMIN_KEY));
    assert_eq!(format!("{}", api_key), "<REDACTED>");
}
