//! Diff command - compare plans with the live objects

use console::style;
use std::path::PathBuf;

use crate::context::GlobalArgs;
use crate::display::print_diff;
use crate::error::{CliError, Result};
use crate::plan::PlanFile;

/// Prints one diff per plan; with `exit_code` set, changes fail the command
pub async fn run(global: &GlobalArgs, plans: &[PathBuf], exit_code: bool) -> Result<()> {
    let provider = global.provider(true).await?;
    let mut changed = 0;

    for path in plans {
        let plan = PlanFile::load(path)?;
        let (adapter, _) = provider.resource(&plan.type_name)?;
        plan.check(adapter.validate(&plan.attributes))?;
        let diff = adapter.plan(&plan.attributes).await?;
        if diff.has_changes() {
            changed += 1;
        }
        print_diff(&plan.label(), &diff);
        println!();
    }

    if changed == 0 {
        println!("{} No changes", style("✓").green().bold());
        return Ok(());
    }

    println!("{} {} of {} plan(s) would change", style("~").yellow().bold(), changed, plans.len());
    if exit_code {
        return Err(CliError::Other {
            message: format!("{} plan(s) have changes", changed),
        });
    }
    Ok(())
}
