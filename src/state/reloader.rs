// Periodic reload of global configuration and key configuration

use crate::state::global_conf::FileGlobalConf;
use crate::state::key_conf::FileKeyConf;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

pub struct ConfReloader {
    global_conf: Arc<FileGlobalConf>,
    key_conf: Arc<FileKeyConf>,
    interval: Duration,
}

impl ConfReloader {
    pub fn new(global_conf: Arc<FileGlobalConf>, key_conf: Arc<FileKeyConf>, interval: Duration) -> Self {
        Self {
            global_conf,
            key_conf,
            interval,
        }
    }

    /// Reload both configurations once; returns how many reloads succeeded
    pub fn reload_once(&self) -> usize {
        let mut reloaded = 0;

        match self.global_conf.reload() {
            Ok(()) => reloaded += 1,
            Err(e) => warn!(error = %e, "Global configuration reload failed, keeping previous snapshot"),
        }
        match self.key_conf.reload() {
            Ok(()) => reloaded += 1,
            Err(e) => warn!(error = %e, "Key configuration reload failed, keeping previous key"),
        }

        reloaded
    }

    /// Spawn the reload loop; the first tick fires after one interval
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let reloaded = self.reload_once();
                debug!(reloaded, "Configuration reload tick");
            }
        })
    }
}
