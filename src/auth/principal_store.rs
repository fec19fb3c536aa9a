// Lookup of admin principals by API key hash

use crate::auth::api_key::{ApiKey, ApiKeyHash};
use crate::auth::authority::Principal;

/// Registered API key hashes and the principals they authenticate
#[derive(Debug, Default)]
pub struct PrincipalStore {
    entries: Vec<(ApiKeyHash, Principal)>,
}

impl PrincipalStore {
    pub fn new(entries: Vec<(ApiKeyHash, Principal)>) -> Self {
        Self { entries }
    }

    /// Find the principal for a key.
    ///
    /// Every entry is compared so the lookup time does not depend on which entry matched.
    pub fn authenticate(&self, api_key: &ApiKey) -> Option<Principal> {
        let hash = api_key.hash();
        let mut found = None;
        for (stored, principal) in &self.entries {
            if stored.ct_matches(&hash) && found.is_none() {
                found = Some(principal.clone());
            }
        }
        found
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
