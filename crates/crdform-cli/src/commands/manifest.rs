//! Manifest command - render plans to Kubernetes YAML without a cluster

use crdform_core::keys;
use crdform_kube::AdapterError;
use std::path::{Path, PathBuf};

use crate::context::GlobalArgs;
use crate::error::{CliError, Result};
use crate::plan::PlanFile;

pub async fn run(global: &GlobalArgs, plans: &[PathBuf], output: Option<&Path>) -> Result<()> {
    let provider = global.provider(false).await?;
    let mut documents = Vec::with_capacity(plans.len());

    for path in plans {
        let plan = PlanFile::load(path)?;
        let adapter = provider.manifest(&plan.type_name).map_err(|e| match e {
            AdapterError::UnknownType { ref name, .. } if !name.ends_with("_manifest") => {
                CliError::usage_with_help(
                    e.to_string(),
                    format!("manifest types end with _manifest, e.g. {}_manifest", name),
                )
            }
            other => other.into(),
        })?;
        tracing::debug!(path = %path.display(), type_name = %plan.type_name, "rendering manifest");
        let state = adapter.read(&plan.attributes)?;
        let yaml = state.get(keys::YAML).and_then(|v| v.as_str()).unwrap_or_default();
        documents.push(yaml.to_string());
    }

    let rendered = documents.join("---\n");
    match output {
        Some(path) => {
            std::fs::write(path, &rendered).map_err(|e| CliError::io_at(path, e))?;
            eprintln!("Wrote {} document(s) to {}", documents.len(), path.display());
        }
        None => print!("{}", rendered),
    }
    Ok(())
}
