//! Apply command - create or update objects from plan files

use console::style;
use crdform_core::{keys, resource_id};
use crdform_kube::{AdapterError, Provider};
use futures::stream::{self, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::Value;
use std::path::{Path, PathBuf};

use crate::context::GlobalArgs;
use crate::display::format_diagnostics;
use crate::error::{CliError, Result};
use crate::plan::PlanFile;
use crate::state::StateStore;

/// Maximum number of plans applied at once
pub const DEFAULT_PARALLELISM: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Created,
    Updated,
}

pub async fn run(global: &GlobalArgs, plans: &[PathBuf], parallelism: usize) -> Result<()> {
    if plans.is_empty() {
        return Err(CliError::usage("no plan files given"));
    }

    let provider = global.provider(true).await?;
    let store = global.state_store();

    println!(
        "{} Applying {} plan(s) with field manager {}",
        style("→").blue().bold(),
        plans.len(),
        style(&provider.config().field_manager).cyan()
    );

    let progress = ProgressBar::new(plans.len() as u64);
    progress.set_style(
        ProgressStyle::with_template("{spinner:.green} [{elapsed_precise}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );

    let results: Vec<(PathBuf, Result<(String, Outcome)>)> = stream::iter(plans.iter().cloned())
        .map(|path| {
            let provider = &provider;
            let store = &store;
            let progress = &progress;
            async move {
                progress.set_message(path.display().to_string());
                let result = apply_one(provider, store, &path).await;
                progress.inc(1);
                (path, result)
            }
        })
        .buffer_unordered(parallelism.max(1))
        .collect()
        .await;
    progress.finish_and_clear();

    let total = results.len();
    let mut failures = Vec::new();
    for (path, result) in results {
        match result {
            Ok((id, outcome)) => {
                let verb = match outcome {
                    Outcome::Created => style("created").green(),
                    Outcome::Updated => style("updated").yellow(),
                };
                println!("  {} {} {} ({})", style("✓").green().bold(), id, verb, path.display());
            }
            Err(e) => {
                println!("  {} {}: {}", style("✗").red().bold(), path.display(), e);
                failures.push(e);
            }
        }
    }

    match failures.len() {
        0 => {
            println!("{} Applied {} plan(s)", style("✓").green().bold(), total);
            Ok(())
        }
        _ if total == 1 => Err(failures.remove(0)),
        failed => Err(CliError::ApplyFailed {
            failed,
            total,
            code: failures[0].exit_code(),
        }),
    }
}

async fn apply_one(provider: &Provider, store: &StateStore, path: &Path) -> Result<(String, Outcome)> {
    let plan = PlanFile::load(path)?;
    let (adapter, diags) = provider.resource(&plan.type_name)?;
    if diags.has_error() {
        tracing::debug!(type_name = %plan.type_name, "{}", format_diagnostics(&diags));
    }
    plan.check(adapter.validate(&plan.attributes))?;

    let (namespace, name) = identity(&plan.attributes)?;
    let existing = store.load(&plan.type_name, &namespace, &name)?;

    let (applied, outcome) = match existing {
        Some(previous) => {
            let mut attributes = plan.attributes.clone();
            if let (Value::Object(fields), Some(id)) = (&mut attributes, previous.attributes.get(keys::ID)) {
                fields.insert(keys::ID.to_string(), id.clone());
            }
            (adapter.update(&attributes).await, Outcome::Updated)
        }
        None => (adapter.create(&plan.attributes).await, Outcome::Created),
    };

    let state = record(store, &plan.type_name, applied)?;
    let id = state
        .get(keys::ID)
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| resource_id(&name, &namespace));
    Ok((id, outcome))
}

/// Save whatever reached the cluster, even when a later step failed
fn record(
    store: &StateStore,
    type_name: &str,
    applied: std::result::Result<Value, AdapterError>,
) -> Result<Value> {
    match applied {
        Ok(state) => {
            store.save(type_name, &state)?;
            Ok(state)
        }
        Err(AdapterError::PartiallyApplied { state, source }) => {
            let path = store.save(type_name, &state)?;
            tracing::warn!(path = %path.display(), "object applied but not ready; state saved");
            Err(CliError::from(*source))
        }
        Err(e) => Err(e.into()),
    }
}

fn identity(attributes: &Value) -> Result<(String, String)> {
    let field = |key: &str| {
        attributes
            .get(keys::METADATA)
            .and_then(|m| m.get(key))
            .and_then(Value::as_str)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
            .ok_or_else(|| CliError::validation(format!("plan has no metadata.{}", key)))
    };
    Ok((field(keys::NAMESPACE)?, field(keys::NAME)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const LISTENER: &str = "k8s_getambassador_io_listener_v3alpha1";

    fn applied_state() -> Value {
        json!({
            "id": "https/emissary",
            "metadata": {"name": "https", "namespace": "emissary"},
            "spec": {"port": 8443},
            "wait_for": [{"jsonpath": ".status.state", "value": "Ready"}]
        })
    }

    #[test]
    fn test_record_saves_state_after_wait_timeout() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::new(dir.path());
        let timeout = AdapterError::WaitTimeout {
            kind: "Listener".into(),
            namespace: "emissary".into(),
            name: "https".into(),
            jsonpath: ".status.state".into(),
            expected: "Ready".into(),
            timeout: "5s".into(),
            last: "<absent>".into(),
        };

        let err = record(
            &store,
            LISTENER,
            Err(AdapterError::PartiallyApplied {
                state: Box::new(applied_state()),
                source: Box::new(timeout),
            }),
        )
        .unwrap_err();
        assert_eq!(err.exit_code(), crate::exit_codes::CLUSTER_ERROR);

        let saved = store.load(LISTENER, "emissary", "https").unwrap().unwrap();
        assert_eq!(saved.attributes, applied_state());
    }

    #[test]
    fn test_record_skips_state_on_failure() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::new(dir.path());
        let offline = AdapterError::Offline {
            type_name: LISTENER.into(),
            operation: "create",
        };

        assert!(record(&store, LISTENER, Err(offline)).is_err());
        assert!(store.load(LISTENER, "emissary", "https").unwrap().is_none());

        let state = record(&store, LISTENER, Ok(applied_state())).unwrap();
        assert_eq!(state["id"], "https/emissary");
        assert!(store.load(LISTENER, "emissary", "https").unwrap().is_some());
    }
}
