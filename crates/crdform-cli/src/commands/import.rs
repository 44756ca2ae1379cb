//! Import command - adopt an existing object into local state

use console::style;

use crate::commands::read::{OutputFormat, print_state};
use crate::context::GlobalArgs;
use crate::error::Result;

pub async fn run(global: &GlobalArgs, type_name: &str, id: &str, output: Option<OutputFormat>) -> Result<()> {
    super::parse_id(id)?;
    let provider = global.provider(true).await?;
    let (adapter, _) = provider.resource(type_name)?;
    let store = global.state_store();

    let seed = adapter.import_state(id)?;
    let state = adapter.read(&seed).await?;
    let path = store.save(type_name, &state)?;

    println!(
        "{} Imported {} into {}",
        style("✓").green().bold(),
        style(id).cyan(),
        path.display()
    );
    if let Some(output) = output {
        print_state(&state, output)?;
    }
    Ok(())
}
