use super::{build_plan, PartialApplyFailure};
use crate::output::{emit_structured, print_plan, print_report};
use crate::Inputs;
use anyhow::{Context, Result};
use reconciler::ReconcilePolicy;
use tracing::{info, warn};

/// Plan, then apply. The snapshot file is rewritten only on a real run.
pub async fn execute(
    inputs: &Inputs,
    policy: ReconcilePolicy,
    expected_fingerprint: Option<&str>,
    format: &str,
) -> Result<()> {
    let dry_run = policy.dry_run;
    let (directory, session, plan) = build_plan(inputs, policy).await?;

    if format == "text" {
        print_plan(&plan);
        println!();
    }

    let report = session.apply(&plan, expected_fingerprint).await?;

    if !dry_run && report.applied > 0 {
        directory
            .save()
            .await
            .context("Failed to write directory snapshot")?;
        info!("Directory snapshot updated at {:?}", inputs.directory);
    }

    if !emit_structured(&report, format)? {
        print_report(&report);
    }

    if report.has_failures() {
        warn!(failed = report.failed, "Apply finished with failures");
        return Err(PartialApplyFailure {
            failed: report.failed,
            total: report.total_operations,
        }
        .into());
    }
    Ok(())
}
