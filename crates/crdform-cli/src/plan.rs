//! Plan files: `{type: <type_name>, attributes: {...}}` in YAML or JSON

use crdform_core::Diagnostics;
use crdform_kube::AdapterError;
use serde::Deserialize;
use serde_json::Value;
use std::path::{Path, PathBuf};

use crate::error::{CliError, Result};

#[derive(Debug, Clone, Deserialize)]
pub struct PlanFile {
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default = "empty_object")]
    pub attributes: Value,
    #[serde(skip)]
    pub path: PathBuf,
}

fn empty_object() -> Value {
    Value::Object(Default::default())
}

impl PlanFile {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| CliError::io_at(path, e))?;
        let mut plan: PlanFile = serde_yaml::from_str(&content).map_err(|e| {
            CliError::usage_with_help(
                format!("invalid plan file {}: {}", path.display(), e),
                "a plan file looks like:\n  type: k8s_<group>_<kind>_<version>\n  attributes:\n    metadata: {name: ..., namespace: ...}\n    spec: {...}",
            )
        })?;
        plan.path = path.to_path_buf();
        Ok(plan)
    }

    /// Fail when validating the attributes produced errors
    pub fn check(&self, diagnostics: Diagnostics) -> Result<()> {
        if !diagnostics.has_error() {
            return Ok(());
        }
        Err(AdapterError::InvalidPlan {
            type_name: self.type_name.clone(),
            diagnostics,
        }
        .into())
    }

    /// Short label for output: the file name and the type
    pub fn label(&self) -> String {
        format!("{} ({})", self.path.display(), self.type_name)
    }
}
