// Authentication key configuration

use crate::core::crypto::AuthKey;
use crate::core::errors::ServerError;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};
use tracing::info;

/// Read access to the server's current authentication key
pub trait KeyConfProvider: Send + Sync {
    fn auth_key(&self) -> Arc<AuthKey>;
}

/// Key material loaded from PEM files and swapped on reload
pub struct FileKeyConf {
    cert_chain_path: Option<PathBuf>,
    private_key_path: Option<PathBuf>,
    current: RwLock<Arc<AuthKey>>,
}

impl FileKeyConf {
    pub fn load(cert_chain_path: Option<PathBuf>, private_key_path: Option<PathBuf>) -> Result<Self, ServerError> {
        let conf = Self {
            cert_chain_path,
            private_key_path,
            current: RwLock::new(Arc::new(AuthKey::default())),
        };
        conf.reload()?;
        Ok(conf)
    }

    /// Fixed key without backing files
    pub fn from_auth_key(key: AuthKey) -> Self {
        Self {
            cert_chain_path: None,
            private_key_path: None,
            current: RwLock::new(Arc::new(key)),
        }
    }

    /// Re-read the key files; on error the previous key stays in place
    pub fn reload(&self) -> Result<(), ServerError> {
        if self.cert_chain_path.is_none() && self.private_key_path.is_none() {
            return Ok(());
        }

        let key = AuthKey::load(self.cert_chain_path.as_deref(), self.private_key_path.as_deref())?;

        if let Some(chain) = key.cert_chain() {
            info!(
                certificates = chain.len(),
                fingerprints = ?chain.fingerprints(),
                "Authentication certificate chain loaded"
            );
        }
        if let Some(private_key) = key.private_key() {
            info!(algorithm = %private_key.algorithm(), "Authentication private key loaded");
        }

        let mut guard = self.current.write().unwrap_or_else(|e| e.into_inner());
        *guard = Arc::new(key);
        Ok(())
    }
}

impl KeyConfProvider for FileKeyConf {
    fn auth_key(&self) -> Arc<AuthKey> {
        Arc::clone(&self.current.read().unwrap_or_else(|e| e.into_inner()))
    }
}
