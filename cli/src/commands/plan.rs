use super::build_plan;
use crate::output::{emit_structured, print_plan};
use crate::Inputs;
use anyhow::Result;
use reconciler::ReconcilePolicy;

/// Compute and print the plan without touching the directory
pub async fn execute(inputs: &Inputs, policy: ReconcilePolicy, format: &str) -> Result<()> {
    let (_, _, plan) = build_plan(inputs, policy).await?;

    if !emit_structured(&plan, format)? {
        print_plan(&plan);
    }
    Ok(())
}
