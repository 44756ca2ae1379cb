//! File-based state store
//!
//! One JSON document per resource at
//! `<state-dir>/<type_name>/<namespace>/<name>.json`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::PathBuf;

use crate::error::{CliError, Result};

/// Default directory, relative to the working directory
pub const DEFAULT_STATE_DIR: &str = ".crdform/state";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredState {
    pub type_name: String,
    pub updated_at: DateTime<Utc>,
    pub attributes: Value,
}

#[derive(Debug, Clone)]
pub struct StateStore {
    root: PathBuf,
}

impl StateStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn path_for(&self, type_name: &str, namespace: &str, name: &str) -> PathBuf {
        self.root
            .join(type_name)
            .join(namespace)
            .join(format!("{}.json", name))
    }

    pub fn load(&self, type_name: &str, namespace: &str, name: &str) -> Result<Option<StoredState>> {
        let path = self.path_for(type_name, namespace, name);
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&path).map_err(|e| CliError::io_at(&path, e))?;
        Ok(Some(serde_json::from_str(&content)?))
    }

    /// Write state; namespace and name come from its `metadata`
    pub fn save(&self, type_name: &str, attributes: &Value) -> Result<PathBuf> {
        let (namespace, name) = identity(attributes)?;
        let path = self.path_for(type_name, namespace, name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| CliError::io_at(parent, e))?;
        }

        let stored = StoredState {
            type_name: type_name.to_string(),
            updated_at: Utc::now(),
            attributes: attributes.clone(),
        };
        let content = serde_json::to_string_pretty(&stored)?;
        std::fs::write(&path, content).map_err(|e| CliError::io_at(&path, e))?;
        tracing::debug!(path = %path.display(), "saved state");
        Ok(path)
    }

    /// Remove state; returns whether a file existed
    pub fn remove(&self, type_name: &str, namespace: &str, name: &str) -> Result<bool> {
        let path = self.path_for(type_name, namespace, name);
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(CliError::io_at(&path, e)),
        }
    }
}

fn identity(attributes: &Value) -> Result<(&str, &str)> {
    let field = |key: &str| {
        attributes
            .get("metadata")
            .and_then(|m| m.get(key))
            .and_then(Value::as_str)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| CliError::validation(format!("state has no metadata.{}", key)))
    };
    Ok((field("namespace")?, field("name")?))
}
