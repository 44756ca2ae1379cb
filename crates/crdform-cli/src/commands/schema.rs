//! Schema command - inspect the resource types built from CRDs

use console::style;
use crdform_core::Variant;
use serde::Serialize;

use crate::context::GlobalArgs;
use crate::display::{print_diagnostics, print_schema, print_summary};
use crate::error::{CliError, Result};

#[derive(Serialize)]
struct TypeListing<'a> {
    #[serde(rename = "type")]
    type_name: &'a str,
    api_version: String,
    kind: &'a str,
    plural: &'a str,
    manifest: &'a str,
}

/// List every resource type of the catalog
pub async fn list(global: &GlobalArgs, json: bool) -> Result<()> {
    let provider = global.provider(false).await?;
    let catalog = provider.catalog();

    if json {
        let listing: Vec<TypeListing> = catalog
            .kinds()
            .map(|kind| TypeListing {
                type_name: &kind.resource.type_name,
                api_version: kind.resource.api.api_version(),
                kind: &kind.resource.api.kind,
                plural: &kind.resource.api.plural,
                manifest: &kind.manifest.type_name,
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&listing)?);
        return Ok(());
    }

    println!(
        "{} {} resource type(s) for provider {}",
        style("→").blue().bold(),
        catalog.len(),
        style(catalog.provider_name()).cyan()
    );
    for kind in catalog.kinds() {
        println!(
            "  {} {}",
            style(&kind.resource.type_name).bold(),
            style(format!("({})", kind.resource.api)).dim()
        );
    }
    Ok(())
}

/// Print the attribute tree of one type
pub async fn show(global: &GlobalArgs, type_name: &str, data_source: bool) -> Result<()> {
    let provider = global.provider(false).await?;
    let variant = if data_source {
        Variant::DataSource
    } else {
        super::plan_variant(&provider, type_name)
    };
    let schema = provider.schema(variant, type_name)?;
    print_schema(schema);
    Ok(())
}

/// Self-check every schema, plus the warnings from loading CRDs
pub async fn check(global: &GlobalArgs, json: bool, strict: bool) -> Result<()> {
    let provider = global.provider(false).await?;
    let catalog = provider.catalog();

    let mut diags = catalog.validate_implementation();
    diags.append(catalog.warnings().clone());

    let errors = diags.errors().count();
    let warnings = diags.warnings().count();

    if json {
        println!("{}", serde_json::to_string_pretty(&diags)?);
    } else {
        println!(
            "{} Checking {} resource type(s)",
            style("→").blue().bold(),
            catalog.len()
        );
        print_diagnostics("schemas", &diags);
        println!();
        print_summary(&diags);
    }

    if errors > 0 || (strict && warnings > 0) {
        return Err(CliError::validation(format!(
            "{} error(s), {} warning(s) in the catalog",
            errors, warnings
        )));
    }
    Ok(())
}
