use crate::error::{Error, Result};
use config::{Config, Environment, File};
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize)]
pub struct AppConfig {
    pub recovery: RecoveryConfig,
    pub locks: LockConfig,
}

/// Unmapped-recovery sweep cadence. Operationally ~10 minutes; anything
/// shorter mostly re-scans the same stuck positions.
#[derive(Debug, Deserialize)]
pub struct RecoveryConfig {
    pub interval_secs: u64,
}

#[derive(Debug, Deserialize)]
pub struct LockConfig {
    /// Partition locks idle longer than this are eligible for gc.
    pub idle_ttl_secs: u64,
}

impl AppConfig {
    pub fn load(env: &str) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::with_name("config/default"))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(Environment::with_prefix("RECON").separator("__"))
            .build()
            .map_err(|e| Error::ConfigError(e.to_string()))?;

        config
            .try_deserialize()
            .map_err(|e| Error::ConfigError(e.to_string()))
    }

    pub fn recovery_interval(&self) -> Duration {
        Duration::from_secs(self.recovery.interval_secs)
    }

    pub fn lock_idle_ttl(&self) -> Duration {
        Duration::from_secs(self.locks.idle_ttl_secs)
    }
}
