//! Read command - look up a live object through the data source variant

use serde_json::Value;

use crate::context::GlobalArgs;
use crate::error::Result;

/// Output format of the state
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Json,
    Yaml,
}

pub async fn run(global: &GlobalArgs, type_name: &str, id: &str, output: OutputFormat) -> Result<()> {
    let id = super::parse_id(id)?;
    let provider = global.provider(true).await?;
    let (adapter, _) = provider.data_source(type_name)?;

    let state = adapter.read(&id.seed_state()).await?;
    print_state(&state, output)
}

pub(crate) fn print_state(state: &Value, output: OutputFormat) -> Result<()> {
    let rendered = match output {
        OutputFormat::Json => serde_json::to_string_pretty(state)?,
        OutputFormat::Yaml => serde_yaml::to_string(state)?,
    };
    println!("{}", rendered.trim_end());
    Ok(())
}
