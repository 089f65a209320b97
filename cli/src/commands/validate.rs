use super::load_manifest;
use crate::output::emit_structured;
use anyhow::Result;
use colored::*;
use manifest::{RuleKind, TargetKind};
use serde::Serialize;
use std::path::Path;
use tracing::info;

#[derive(Debug, Serialize)]
struct ValidationSummary {
    manifest: String,
    valid: bool,
    rules: usize,
    explicit_rules: usize,
    implicit_rules: usize,
    account_rules: usize,
    ou_rules: usize,
    ignore_entries: usize,
    ignored_names: usize,
}

/// Validate a manifest file and print a summary
pub fn execute(path: &Path, format: &str) -> Result<()> {
    let manifest = load_manifest(path)?;
    info!(rules = manifest.rbac_rules.len(), "Manifest {:?} is valid", path);

    let rules = &manifest.rbac_rules;
    let summary = ValidationSummary {
        manifest: path.display().to_string(),
        valid: true,
        rules: manifest.rbac_rules.len(),
        explicit_rules: rules.iter().filter(|r| r.rule_kind == RuleKind::Explicit).count(),
        implicit_rules: rules.iter().filter(|r| r.rule_kind == RuleKind::Implicit).count(),
        account_rules: rules.iter().filter(|r| r.target_kind == TargetKind::Account).count(),
        ou_rules: rules.iter().filter(|r| r.target_kind == TargetKind::Ou).count(),
        ignore_entries: manifest.ignore.len(),
        ignored_names: manifest.ignore.iter().map(|e| e.target_names.len()).sum(),
    };

    if emit_structured(&summary, format)? {
        return Ok(());
    }

    println!("{} {}", "✓".green().bold(), format!("{} is valid", summary.manifest).green());
    println!(
        "  {}: {} ({} explicit, {} implicit; {} account, {} OU)",
        "Rules".bold(),
        summary.rules,
        summary.explicit_rules,
        summary.implicit_rules,
        summary.account_rules,
        summary.ou_rules
    );
    println!(
        "  {}: {} entries covering {} names",
        "Ignore".bold(),
        summary.ignore_entries,
        summary.ignored_names
    );
    Ok(())
}
