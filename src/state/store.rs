// Transactional holder of the server configuration with optional YAML write-back

use crate::core::errors::ServerError;
use crate::state::serverconf::ServerConf;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, error};

/// Server configuration store
///
/// Writers are serialized by the lock. A transaction mutates a private copy
/// of the arena and publishes it only when the closure succeeds and the
/// write-back (if configured) has been persisted. Persisting and publishing
/// run in a spawned task that owns the write guard, so dropping the caller
/// after the closure has succeeded still commits to disk and memory together.
pub struct ServerConfStore {
    state: Arc<RwLock<ServerConf>>,
    write_back: Option<PathBuf>,
}

impl ServerConfStore {
    pub fn new(conf: ServerConf) -> Self {
        Self {
            state: Arc::new(RwLock::new(conf)),
            write_back: None,
        }
    }

    /// Persist every committed transaction to `path`
    pub fn with_write_back(mut self, path: PathBuf) -> Self {
        self.write_back = Some(path);
        self
    }

    /// Run `f` against a consistent read-only view
    pub async fn read<T, F>(&self, f: F) -> T
    where
        F: FnOnce(&ServerConf) -> T,
    {
        let guard = self.state.read().await;
        f(&guard)
    }

    /// Run `f` as one transaction; any error leaves the store unchanged
    pub async fn transaction<T, F>(&self, f: F) -> Result<T, ServerError>
    where
        F: FnOnce(&mut ServerConf) -> Result<T, ServerError>,
    {
        let mut guard = self.state.clone().write_owned().await;
        let mut working = guard.clone();

        let value = f(&mut working)?;

        let write_back = self.write_back.clone();
        let commit = tokio::spawn(async move {
            if let Some(path) = &write_back {
                Self::persist(path, &working).await?;
            }
            *guard = working;
            Ok::<(), ServerError>(())
        });
        commit.await.map_err(|e| {
            error!(error = %e, "Server configuration commit task failed");
            ServerError::Persistence(format!("Commit task failed: {}", e))
        })??;

        debug!("Server configuration transaction committed");
        Ok(value)
    }

    /// Clone of the current state
    pub async fn snapshot(&self) -> ServerConf {
        self.state.read().await.clone()
    }

    async fn persist(path: &PathBuf, conf: &ServerConf) -> Result<(), ServerError> {
        let yaml = serde_yaml::to_string(conf)
            .map_err(|e| ServerError::Persistence(format!("Failed to serialize server configuration: {}", e)))?;

        let tmp_path = path.with_extension("yaml.tmp");
        tokio::fs::write(&tmp_path, yaml).await.map_err(|e| {
            error!(path = ?tmp_path, error = %e, "Failed to write server configuration");
            ServerError::Persistence(format!("Failed to write {:?}: {}", tmp_path, e))
        })?;
        tokio::fs::rename(&tmp_path, path).await.map_err(|e| {
            error!(path = ?path, error = %e, "Failed to replace server configuration");
            ServerError::Persistence(format!("Failed to replace {:?}: {}", path, e))
        })?;

        Ok(())
    }
}
