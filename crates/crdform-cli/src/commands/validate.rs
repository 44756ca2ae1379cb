//! Validate command - check plan files against their schemas

use console::style;
use crdform_core::{Diagnostics, validate_config};
use serde::Serialize;
use std::path::PathBuf;

use crate::context::GlobalArgs;
use crate::display::{print_diagnostics, print_summary};
use crate::error::{CliError, Result};
use crate::plan::PlanFile;

#[derive(Serialize)]
struct PlanReport {
    path: String,
    #[serde(rename = "type")]
    type_name: String,
    valid: bool,
    diagnostics: Diagnostics,
}

pub async fn run(global: &GlobalArgs, plans: &[PathBuf], json: bool, strict: bool) -> Result<()> {
    let provider = global.provider(false).await?;
    let mut reports = Vec::with_capacity(plans.len());

    for path in plans {
        let plan = PlanFile::load(path)?;
        let variant = super::plan_variant(&provider, &plan.type_name);
        let schema = provider.schema(variant, &plan.type_name)?;
        let diagnostics = validate_config(schema, &plan.attributes);

        if !json {
            let icon = if diagnostics.has_error() {
                style("✗").red().bold()
            } else {
                style("✓").green().bold()
            };
            println!("{} {}", icon, plan.label());
            print_diagnostics(&path.display().to_string(), &diagnostics);
        }

        reports.push(PlanReport {
            path: path.display().to_string(),
            type_name: plan.type_name,
            valid: !diagnostics.has_error(),
            diagnostics,
        });
    }

    let mut all = Diagnostics::new();
    for report in &reports {
        all.append(report.diagnostics.clone());
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
    } else {
        println!();
        print_summary(&all);
    }

    let errors = all.errors().count();
    let warnings = all.warnings().count();
    if errors > 0 || (strict && warnings > 0) {
        let invalid = reports.iter().filter(|r| !r.valid).count();
        return Err(CliError::validation(format!(
            "{} of {} plan(s) invalid",
            invalid.max(1),
            reports.len()
        )));
    }
    Ok(())
}
