//! Provider configuration
//!
//! Stored in `~/.config/crdform/config.yaml`; every setting can be
//! overridden through the environment (`CRDFORM_*`) and then by CLI flags.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::client::ResourceClient;
use crate::error::{AdapterError, Result};

/// Default field manager for server-side apply
pub const DEFAULT_FIELD_MANAGER: &str = "crdform";

pub const ENV_OFFLINE: &str = "CRDFORM_OFFLINE";
pub const ENV_FIELD_MANAGER: &str = "CRDFORM_FIELD_MANAGER";
pub const ENV_FORCE_CONFLICTS: &str = "CRDFORM_FORCE_CONFLICTS";

/// Provider-wide settings shared by every adapter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProviderConfig {
    /// Field manager used when a resource does not set one
    pub field_manager: String,

    /// Force conflicts when a resource does not say otherwise
    pub force_conflicts: bool,

    /// Run without a cluster (manifests only)
    pub offline: bool,

    /// Default timeout of a `wait_for` entry
    #[serde(with = "humantime_serde")]
    pub wait_timeout: Duration,

    /// Delay between two polls of a `wait_for` entry
    #[serde(with = "humantime_serde")]
    pub poll_interval: Duration,

    /// Kubeconfig file (default discovery when unset)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kubeconfig: Option<PathBuf>,

    /// Kubeconfig context (current context when unset)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            field_manager: DEFAULT_FIELD_MANAGER.to_string(),
            force_conflicts: false,
            offline: false,
            wait_timeout: Duration::from_secs(5 * 60),
            poll_interval: Duration::from_secs(2),
            kubeconfig: None,
            context: None,
        }
    }
}

impl ProviderConfig {
    /// Load configuration from the default location, or defaults if absent
    pub fn load() -> Result<Self> {
        let path = Self::default_path()?;
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(crdform_core::CoreError::from)?;
        let config: Self = serde_yaml::from_str(&content).map_err(crdform_core::CoreError::from)?;
        Ok(config)
    }

    /// Save configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(crdform_core::CoreError::from)?;
        }
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content).map_err(crdform_core::CoreError::from)?;
        Ok(())
    }

    /// Get default configuration path
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().ok_or_else(|| AdapterError::Connection {
            message: "could not determine config directory".to_string(),
        })?;
        Ok(config_dir.join("crdform").join("config.yaml"))
    }

    /// Apply `CRDFORM_*` environment overrides
    #[must_use]
    pub fn with_env(self) -> Self {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from a variable lookup
    #[must_use]
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(offline) = lookup(ENV_OFFLINE).and_then(|v| parse_bool(&v)) {
            self.offline = offline;
        }
        if let Some(manager) = lookup(ENV_FIELD_MANAGER).filter(|v| !v.trim().is_empty()) {
            self.field_manager = manager;
        }
        if let Some(force) = lookup(ENV_FORCE_CONFLICTS).and_then(|v| parse_bool(&v)) {
            self.force_conflicts = force;
        }
        self
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}

/// What the provider hands to every adapter through `configure`
#[derive(Clone)]
pub struct ProviderData {
    pub config: ProviderConfig,
    /// Shared client handle; `None` in offline mode
    pub client: Option<Arc<dyn ResourceClient>>,
}

impl ProviderData {
    pub fn new(config: ProviderConfig, client: Arc<dyn ResourceClient>) -> Self {
        Self {
            config,
            client: Some(client),
        }
    }

    pub fn offline(config: ProviderConfig) -> Self {
        Self {
            config: ProviderConfig {
                offline: true,
                ..config
            },
            client: None,
        }
    }
}

impl std::fmt::Debug for ProviderData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderData")
            .field("config", &self.config)
            .field("client", &self.client.as_ref().map(|_| "<client>"))
            .finish()
    }
}
