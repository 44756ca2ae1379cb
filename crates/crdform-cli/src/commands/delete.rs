//! Delete command - remove an object and its local state

use console::style;

use crate::context::GlobalArgs;
use crate::error::Result;

pub async fn run(global: &GlobalArgs, type_name: &str, id: &str, keep_state: bool) -> Result<()> {
    let import_id = super::parse_id(id)?;
    let provider = global.provider(true).await?;
    let (adapter, _) = provider.resource(type_name)?;
    let store = global.state_store();

    let state = match store.load(type_name, &import_id.namespace, &import_id.name)? {
        Some(stored) => {
            tracing::debug!(type_name = %stored.type_name, updated_at = %stored.updated_at, "using local state");
            stored.attributes
        }
        None => {
            tracing::debug!(id = %import_id, "no local state, deleting by identifier");
            adapter.import_state(id)?
        }
    };

    println!(
        "{} Deleting {} {}",
        style("→").blue().bold(),
        adapter.schema().api.kind,
        style(&import_id).cyan()
    );
    adapter.delete(&state).await?;

    if !keep_state && store.remove(type_name, &import_id.namespace, &import_id.name)? {
        tracing::debug!(id = %import_id, "removed local state");
    }
    println!("{} Deleted {}", style("✓").green().bold(), style(&import_id).cyan());
    Ok(())
}
