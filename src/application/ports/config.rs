//! Persistence of user settings

use async_trait::async_trait;
use std::path::PathBuf;

use crate::domain::config::AppConfig;
use crate::domain::error::ConfigError;

/// Backing store for the `[spotify]` credentials and record defaults.
///
/// Only the file layer of the configuration stack; env vars and CLI flags
/// are merged on top by the caller.
#[async_trait]
pub trait ConfigStore: Send + Sync {
    /// Every field is `None` when nothing has been saved yet
    async fn load(&self) -> Result<AppConfig, ConfigError>;

    async fn save(&self, config: &AppConfig) -> Result<(), ConfigError>;

    fn path(&self) -> PathBuf;

    fn exists(&self) -> bool;

    /// Write [`AppConfig::defaults`]; `AlreadyExists` if a file is present
    async fn init(&self) -> Result<(), ConfigError>;
}
