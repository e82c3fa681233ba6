//! `fabrica validate`: report every problem in a definition file.

use anyhow::{bail, Result};
use colored::Colorize;

use fabrica::cli::DefinitionArgs;
use fabrica::config::Config;
use fabrica::transform::TransformationRegistry;
use fabrica::ui;
use fabrica::validation::{validate_definitions, Severity, ValidationIssue, ValidationReport};

pub fn cmd_validate(config: &Config, definitions: &DefinitionArgs, strict: bool) -> Result<()> {
    let (config_path, config_name) = super::resolve_definitions(config, definitions);
    let registry = TransformationRegistry::with_builtins();
    let report = validate_definitions(&config_path, &config_name, &registry, config.validation.casting);

    for issue in &report.issues {
        if issue.severity == Severity::Error || !ui::is_quiet() {
            display_issue(issue);
        }
    }
    if !ui::is_quiet() {
        display_summary(&config_name, &report);
    }

    if report.has_errors() {
        bail!("Validation of '{}' failed", config_name);
    }
    if strict && report.has_warnings() {
        bail!("Validation of '{}' produced warnings (--strict)", config_name);
    }
    Ok(())
}

fn display_issue(issue: &ValidationIssue) {
    let icon = match issue.severity {
        Severity::Info => "ℹ".blue(),
        Severity::Warning => "⚠".yellow(),
        Severity::Error => "✗".red(),
    };

    println!(
        "  {} {} [{}]: {}",
        icon,
        issue.item_id.cyan(),
        issue.category,
        issue.message
    );

    if let Some(ref suggestion) = issue.suggestion {
        println!("      {} {}", "→".cyan(), suggestion);
    }
}

fn display_summary(config_name: &str, report: &ValidationReport) {
    println!();
    println!("{}", "━".repeat(60).cyan());

    let status_icon = if report.is_valid() {
        "✓".green()
    } else {
        "✗".red()
    };
    print!("{} {}: ", status_icon, config_name.bold());
    if report.total == 0 {
        println!("no features defined");
    } else {
        let failed = report.failed().min(report.total);
        print!("{} features", report.total);
        if failed > 0 {
            print!(", {} {}", failed, "failed".red());
        }
        println!();
    }

    let errors = report.count(Severity::Error);
    let warnings = report.count(Severity::Warning);
    if errors > 0 || warnings > 0 {
        let mut parts = Vec::new();
        if errors > 0 {
            parts.push(format!("{} {}", errors, if errors == 1 { "error" } else { "errors" }.red()));
        }
        if warnings > 0 {
            parts.push(format!(
                "{} {}",
                warnings,
                if warnings == 1 { "warning" } else { "warnings" }.yellow()
            ));
        }
        println!("  {}", parts.join(", "));
    }
}
