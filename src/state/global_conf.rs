// Global configuration snapshot and its validity check

use crate::core::errors::ServerError;
use crate::core::fault::{CodedFault, X_OUTDATED_GLOBALCONF};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use tracing::info;

/// Federation-wide configuration as distributed to the security server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalConfSnapshot {
    pub instance_identifier: String,
    pub expires_at: DateTime<Utc>,
}

/// Read access to the current global configuration
pub trait GlobalConfProvider: Send + Sync {
    /// Fails with `Server.ClientProxy.OutdatedGlobalConf` when no valid snapshot is loaded
    fn verify_validity(&self) -> Result<(), CodedFault>;

    fn instance_identifier(&self) -> Option<String>;
}

/// Global configuration read from a YAML file and swapped on reload
pub struct FileGlobalConf {
    path: Option<PathBuf>,
    current: RwLock<Option<Arc<GlobalConfSnapshot>>>,
}

impl FileGlobalConf {
    /// Load the snapshot stored at `path`
    pub fn load(path: &Path) -> Result<Self, ServerError> {
        let conf = Self {
            path: Some(path.to_path_buf()),
            current: RwLock::new(None),
        };
        conf.reload()?;
        Ok(conf)
    }

    /// Fixed snapshot without a backing file
    pub fn from_snapshot(snapshot: Option<GlobalConfSnapshot>) -> Self {
        Self {
            path: None,
            current: RwLock::new(snapshot.map(Arc::new)),
        }
    }

    /// Re-read the backing file; on error the previous snapshot stays in place
    pub fn reload(&self) -> Result<(), ServerError> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let content = std::fs::read_to_string(path).map_err(|e| {
            ServerError::Configuration(format!("Failed to read global configuration {:?}: {}", path, e))
        })?;
        let snapshot: GlobalConfSnapshot = serde_yaml::from_str(&content).map_err(|e| {
            ServerError::Configuration(format!("Failed to parse global configuration {:?}: {}", path, e))
        })?;

        info!(
            instance = %snapshot.instance_identifier,
            expires_at = %snapshot.expires_at,
            "Global configuration loaded"
        );

        let mut guard = self.current.write().unwrap_or_else(|e| e.into_inner());
        *guard = Some(Arc::new(snapshot));
        Ok(())
    }

    pub fn snapshot(&self) -> Option<Arc<GlobalConfSnapshot>> {
        self.current.read().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl GlobalConfProvider for FileGlobalConf {
    fn verify_validity(&self) -> Result<(), CodedFault> {
        match self.snapshot() {
            None => Err(CodedFault::server(
                X_OUTDATED_GLOBALCONF,
                "Global configuration is not available",
            )),
            Some(snapshot) if snapshot.expires_at <= Utc::now() => Err(CodedFault::server(
                X_OUTDATED_GLOBALCONF,
                format!("Global configuration is expired since {}", snapshot.expires_at),
            )),
            Some(_) => Ok(()),
        }
    }

    fn instance_identifier(&self) -> Option<String> {
        self.snapshot().map(|s| s.instance_identifier.clone())
    }
}
