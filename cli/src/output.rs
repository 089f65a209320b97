use anyhow::Result;
use colored::*;
use reconciler::{ApplyReport, OutcomeStatus, Plan, PlannedChange};
use serde::Serialize;

/// Print `value` as JSON or YAML. Returns false for text, which callers render themselves.
pub fn emit_structured<T: Serialize>(value: &T, format: &str) -> Result<bool> {
    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(value)?);
            Ok(true)
        }
        "yaml" => {
            print!("{}", serde_yaml::to_string(value)?);
            Ok(true)
        }
        _ => Ok(false),
    }
}

const HEADERS: [&str; 4] = ["ACCOUNT", "PERMISSION SET", "PRINCIPAL", "ORIGIN"];

fn row(change: &PlannedChange) -> [String; 4] {
    [
        format!("{} ({})", change.account_label(), change.assignment.account_id),
        change.permission_set_label().to_string(),
        format!("{} {}", change.assignment.principal_kind, change.principal_label()),
        change
            .origin
            .map(|o| o.to_string())
            .unwrap_or_else(|| "-".to_string()),
    ]
}

fn print_table(marker: ColoredString, changes: &[PlannedChange]) {
    let rows: Vec<[String; 4]> = changes.iter().map(row).collect();
    let mut widths = HEADERS.map(str::len);
    for r in &rows {
        for (width, cell) in widths.iter_mut().zip(r.iter()) {
            *width = (*width).max(cell.len());
        }
    }

    let header: Vec<String> = HEADERS
        .iter()
        .zip(widths.iter())
        .map(|(h, w)| format!("{:<width$}", h, width = *w))
        .collect();
    println!("    {}", header.join("  ").dimmed());
    for r in rows {
        let cells: Vec<String> = r
            .iter()
            .zip(widths.iter())
            .map(|(c, w)| format!("{:<width$}", c, width = *w))
            .collect();
        println!("  {} {}", marker, cells.join("  "));
    }
}

/// Render a plan as a changeset
pub fn print_plan(plan: &Plan) {
    println!("{}", "=== Access Plan ===".bold());
    println!("{}: {}", "Fingerprint".bold(), plan.fingerprint.cyan());
    println!();

    if plan.is_empty() {
        println!("{}", "No changes. Directory matches the manifest.".green());
    }

    if !plan.to_create.is_empty() {
        println!("{}", format!("Create ({})", plan.to_create.len()).green().bold());
        print_table("+".green().bold(), &plan.to_create);
        println!();
    }

    if !plan.to_delete.is_empty() {
        println!("{}", format!("Delete ({})", plan.to_delete.len()).red().bold());
        print_table("-".red().bold(), &plan.to_delete);
        println!();
    }

    if !plan.drift.is_empty() {
        println!(
            "{}",
            format!("Drift ({}): not attributable to any rule", plan.drift.len())
                .yellow()
                .bold()
        );
        print_table("!".yellow().bold(), &plan.drift);
        println!();
    }

    println!(
        "{} {} to create, {} to delete, {} unchanged, {} ignored",
        "Summary:".bold(),
        plan.to_create.len(),
        plan.to_delete.len(),
        plan.unchanged,
        plan.ignored.len()
    );
}

/// Render an apply report
pub fn print_report(report: &ApplyReport) {
    let title = if report.dry_run {
        "=== Apply (dry run) ==="
    } else {
        "=== Apply ==="
    };
    println!("{}", title.bold());
    println!("{}: {}", "Fingerprint".bold(), report.fingerprint.cyan());
    println!();

    for outcome in &report.outcomes {
        let status = match outcome.status {
            OutcomeStatus::Applied => "applied".green(),
            OutcomeStatus::AlreadyInSync => "in sync".blue(),
            OutcomeStatus::SkippedDryRun => "skipped".dimmed(),
            OutcomeStatus::Failed => "failed".red().bold(),
        };
        let change = &outcome.change;
        print!(
            "  {:<7} {:<8} {} / {} / {} {}",
            outcome.operation.to_string(),
            status,
            change.account_label(),
            change.permission_set_label(),
            change.assignment.principal_kind,
            change.principal_label()
        );
        match &outcome.message {
            Some(message) => println!(" ({})", message.red()),
            None => println!(),
        }
    }
    if !report.outcomes.is_empty() {
        println!();
    }

    println!(
        "{} {} applied, {} already in sync, {} skipped, {} failed ({}ms)",
        "Summary:".bold(),
        report.applied,
        report.already_in_sync,
        report.skipped,
        report.failed,
        report.execution_time_ms
    );
    if report.dry_run && report.total_operations > 0 {
        println!(
            "{}",
            "Dry run: no changes were made. Re-run with --auto-approve to apply.".yellow()
        );
    }
}
