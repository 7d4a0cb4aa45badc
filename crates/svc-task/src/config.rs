//! # Service Configuration
//!
//! JSON configuration file shared with the other ODIM services. Only the
//! sections the task service reads are modelled; unknown keys are ignored.
//!
//! ```json
//! {
//!   "MessageBusConf": {
//!     "MessageBusType": "Kafka",
//!     "MessageBusConfigFilePath": "/etc/odimra_config/platformconfig.toml",
//!     "OdimTaskEventsQueue": "odim-task-events"
//!   },
//!   "TaskQueueConf": { "QueueSize": 1000, "Workers": 4 }
//! }
//! ```
//!
//! The loaded configuration is shared read-mostly. Another component may
//! `reload` it at runtime; readers always see a complete snapshot.

use crate::domain::ConfigError;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use shared_bus::MessageBusType;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// Environment variable naming the configuration file.
pub const CONFIG_FILE_PATH_ENV: &str = "CONFIG_FILE_PATH";

/// Configuration file used when `CONFIG_FILE_PATH` is unset.
pub const DEFAULT_CONFIG_FILE_PATH: &str = "/etc/odimra_config/odimra_config.json";

/// Complete task service configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    #[serde(rename = "MessageBusConf")]
    pub message_bus: MessageBusConf,

    #[serde(rename = "TaskQueueConf")]
    pub task_queue: TaskQueueConf,
}

/// Message bus settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MessageBusConf {
    #[serde(rename = "MessageBusType")]
    pub bus_type: MessageBusType,

    /// Backend specific client configuration (brokers, TLS material).
    #[serde(rename = "MessageBusConfigFilePath")]
    pub config_file_path: PathBuf,

    /// Topic carrying task events.
    #[serde(rename = "OdimTaskEventsQueue")]
    pub task_events_topic: String,
}

impl Default for MessageBusConf {
    fn default() -> Self {
        Self {
            bus_type: MessageBusType::Kafka,
            config_file_path: PathBuf::from("/etc/odimra_config/platformconfig.toml"),
            task_events_topic: "odim-task-events".to_string(),
        }
    }
}

/// Dispatch queue and worker settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskQueueConf {
    /// Events buffered before the bus callback waits.
    #[serde(rename = "QueueSize")]
    pub queue_size: usize,

    #[serde(rename = "Workers")]
    pub workers: usize,
}

impl Default for TaskQueueConf {
    fn default() -> Self {
        Self {
            queue_size: 1000,
            workers: 4,
        }
    }
}

impl ServiceConfig {
    /// Parse and validate a configuration file.
    ///
    /// # Errors
    ///
    /// `ConfigError` if the file cannot be read, is not valid JSON, or fails
    /// [`validate`](Self::validate).
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_slice(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `CONFIG_FILE_PATH`, or the default location.
    ///
    /// # Errors
    ///
    /// Same as [`load`](Self::load).
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::load(&config_file_path())
    }

    /// Reject settings the service cannot run with.
    ///
    /// # Errors
    ///
    /// `ConfigError::Invalid` naming the offending setting.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.message_bus.task_events_topic.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "MessageBusConf.OdimTaskEventsQueue must not be empty".to_string(),
            ));
        }
        if self.task_queue.queue_size == 0 {
            return Err(ConfigError::Invalid(
                "TaskQueueConf.QueueSize must be at least 1".to_string(),
            ));
        }
        if self.task_queue.workers == 0 {
            return Err(ConfigError::Invalid(
                "TaskQueueConf.Workers must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Path of the configuration file from the environment.
#[must_use]
pub fn config_file_path() -> PathBuf {
    std::env::var_os(CONFIG_FILE_PATH_ENV)
        .map_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE_PATH), PathBuf::from)
}

/// Configuration shared between the subscription manager and reloaders.
#[derive(Debug, Clone, Default)]
pub struct SharedConfig {
    inner: Arc<RwLock<ServiceConfig>>,
}

impl SharedConfig {
    #[must_use]
    pub fn new(config: ServiceConfig) -> Self {
        Self {
            inner: Arc::new(RwLock::new(config)),
        }
    }

    /// Take the read lock. Keep the guard short lived.
    pub fn read(&self) -> parking_lot::RwLockReadGuard<'_, ServiceConfig> {
        self.inner.read()
    }

    /// Copy of the current configuration.
    #[must_use]
    pub fn snapshot(&self) -> ServiceConfig {
        self.inner.read().clone()
    }

    /// Replace the configuration with the contents of `path`.
    ///
    /// The current configuration is kept when the new file is invalid.
    ///
    /// # Errors
    ///
    /// Same as [`ServiceConfig::load`].
    pub fn reload(&self, path: &Path) -> Result<(), ConfigError> {
        let config = ServiceConfig::load(path)?;
        *self.inner.write() = config;
        info!(path = %path.display(), "Configuration reloaded");
        Ok(())
    }
}
