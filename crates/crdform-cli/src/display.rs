//! Display formatting for CLI output
//!
//! Provides structured display for:
//! - Diagnostics grouped by severity, with attribute paths
//! - Schema attribute trees
//! - Plan diffs with colored lines

use console::style;
use crdform_core::{Attribute, AttributeType, Diagnostics, ObjectType, ResourceSchema, Severity};
use crdform_kube::{LineType, PlanAction, PlanDiff};

/// Plain-text rendering, used in miette help sections
pub fn format_diagnostics(diags: &Diagnostics) -> String {
    diags
        .iter()
        .map(|d| {
            let path = d.path.as_ref().map(|p| format!(" at {}", p)).unwrap_or_default();
            format!("{}{}: {}", d.summary, path, d.detail)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Print diagnostics with icons, errors first
pub fn print_diagnostics(source: &str, diags: &Diagnostics) {
    if diags.is_empty() {
        return;
    }

    println!();
    println!("{}", style(source).cyan().bold());
    for diag in diags.errors().chain(diags.warnings()) {
        let icon = match diag.severity {
            Severity::Error => style("✗").red(),
            Severity::Warning => style("⚠").yellow(),
        };
        let path = diag
            .path
            .as_ref()
            .map(|p| format!(" at {}", style(p).dim()))
            .unwrap_or_default();

        println!("  {} {}{}", icon, diag.summary, path);
        if !diag.detail.is_empty() {
            println!("    {}", diag.detail);
        }
    }
}

/// Print the summary line of a diagnostics set
pub fn print_summary(diags: &Diagnostics) {
    let errors = diags.errors().count();
    let warnings = diags.warnings().count();

    if errors == 0 && warnings == 0 {
        println!("{} No issues found", style("✓").green().bold());
    } else if errors == 0 {
        println!("{} {} warning(s)", style("⚠").yellow().bold(), warnings);
    } else {
        println!(
            "{} {} error(s), {} warning(s)",
            style("✗").red().bold(),
            errors,
            warnings
        );
    }
}

/// Print a schema as an indented attribute tree
pub fn print_schema(schema: &ResourceSchema) {
    println!(
        "{} {}",
        style(&schema.type_name).cyan().bold(),
        style(format!("({})", schema.variant)).dim()
    );
    println!("  {} {}", style("API:").bold(), schema.api);
    println!("  {} {}", style("Plural:").bold(), schema.api.plural);
    if !schema.description.is_empty() {
        println!("  {}", schema.description);
    }
    println!();
    print_object(&schema.attributes, 1);
}

fn print_object(object: &ObjectType, depth: usize) {
    for (name, attribute) in object.iter() {
        print_attribute(name, attribute, depth);
    }
}

fn print_attribute(name: &str, attribute: &Attribute, depth: usize) {
    let indent = "  ".repeat(depth);
    let presence = if attribute.presence.is_required() {
        style(attribute.presence.to_string()).yellow()
    } else {
        style(attribute.presence.to_string()).dim()
    };

    let mut line = format!("{}{} {} {}", indent, style(name).bold(), style(&attribute.type_).cyan(), presence);
    if attribute.force_new {
        line.push_str(&format!(" {}", style("forces replacement").red()));
    }
    if name != attribute.json_name {
        line.push_str(&format!(" {}", style(format!("<{}>", attribute.json_name)).dim()));
    }
    println!("{}", line);

    for validator in &attribute.validators {
        println!("{}  {} {}", indent, style("↳").dim(), validator.describe());
    }

    if let Some(nested) = nested_object(&attribute.type_) {
        print_object(nested, depth + 1);
    }
}

fn nested_object(type_: &AttributeType) -> Option<&ObjectType> {
    match type_ {
        AttributeType::Object(object) => Some(object),
        AttributeType::List(element) | AttributeType::Map(element) => nested_object(element),
        _ => None,
    }
}

/// Print a plan diff in unified form
pub fn print_diff(label: &str, diff: &PlanDiff) {
    let action = match diff.action {
        PlanAction::Create => style("+ create").green().bold(),
        PlanAction::Update => style("~ update").yellow().bold(),
        PlanAction::Replace => style("-/+ replace").red().bold(),
        PlanAction::NoOp => style("= no changes").dim(),
    };
    println!("{} {}", action, style(label).cyan());

    if diff.action == PlanAction::NoOp {
        return;
    }
    for line in &diff.content.lines {
        match line.line_type {
            LineType::Added => println!("{}", style(format!("+{}", line.content)).green()),
            LineType::Removed => println!("{}", style(format!("-{}", line.content)).red()),
            LineType::Context => println!(" {}", line.content),
        }
    }

    let (added, removed) = diff.content.stats();
    println!(
        "{}",
        style(format!("{} line(s) added, {} line(s) removed", added, removed)).dim()
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crdform_core::{AttributePath, Diagnostic};

    #[test]
    fn test_format_diagnostics() {
        let mut diags = Diagnostics::new();
        diags.push(
            Diagnostic::error("Invalid attribute value", "must be one of: XFP, SECURE, INSECURE")
                .at(AttributePath::parse("spec.security_model")),
        );
        diags.push(Diagnostic::warning("Unsupported pattern", "dropped"));

        let text = format_diagnostics(&diags);
        assert_eq!(
            text,
            "Invalid attribute value at spec.security_model: must be one of: XFP, SECURE, INSECURE\n\
             Unsupported pattern: dropped"
        );
    }
}
