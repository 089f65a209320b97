use crate::error::Result;
use crate::executor::{ApplyExecutor, ApplyReport};
use crate::plan::Plan;
use crate::policy::ReconcilePolicy;
use directory::{DirectoryProvider, OrgTree};
use manifest::{Manifest, RuleKind};
use resolver::{
    DesiredState, DesiredStateBuilder, DirectoryLookup, IgnoreFilter, ResolutionError,
    RuleResolver,
};
use std::sync::Arc;
use tracing::info;

/// Everything derived from a manifest and the directory before diffing
#[derive(Debug)]
pub struct PreparedState {
    pub tree: OrgTree,
    pub lookup: DirectoryLookup,
    pub ignore: IgnoreFilter,
    pub desired: DesiredState,
}

/// Drives validate-resolve-plan-apply against one directory
pub struct ReconcileSession {
    provider: Arc<dyn DirectoryProvider>,
    executor: ApplyExecutor,
}

impl ReconcileSession {
    pub fn new(provider: Arc<dyn DirectoryProvider>, policy: ReconcilePolicy) -> Self {
        Self {
            executor: ApplyExecutor::new(provider.clone(), policy),
            provider,
        }
    }

    pub fn policy(&self) -> &ReconcilePolicy {
        self.executor.policy()
    }

    /// Fetch the org tree from the directory
    pub async fn org_tree(&self) -> Result<OrgTree> {
        let records = self.provider.list_org_tree().await?;
        Ok(OrgTree::build(records).map_err(ResolutionError::from)?)
    }

    /// Build the desired state for a validated manifest
    pub async fn prepare(&self, manifest: &Manifest) -> Result<PreparedState> {
        let tree = self.org_tree().await?;
        let lookup = DirectoryLookup::run(manifest, self.provider.as_ref()).await?;
        let resolution = RuleResolver::new(&tree, &lookup).resolve(manifest)?;
        let ignore = IgnoreFilter::compile(&manifest.ignore, &tree, &lookup);
        let desired = DesiredStateBuilder::build(&resolution, &ignore);

        info!(
            rules = manifest.rbac_rules.len(),
            desired = desired.assignments.len(),
            explicit = desired.count_of(RuleKind::Explicit),
            implicit = desired.count_of(RuleKind::Implicit),
            excluded = desired.excluded,
            "Prepared desired state"
        );

        Ok(PreparedState {
            tree,
            lookup,
            ignore,
            desired,
        })
    }

    /// Compare the prepared state with what the directory currently holds
    pub async fn plan(&self, prepared: &PreparedState) -> Result<Plan> {
        let observed = self.provider.list_current_assignments().await?;
        let mut plan = Plan::build(&prepared.desired, &observed, &prepared.ignore);
        plan.label(&prepared.tree, &prepared.lookup);
        Ok(plan)
    }

    pub async fn apply(&self, plan: &Plan, expected_fingerprint: Option<&str>) -> Result<ApplyReport> {
        self.executor.apply(plan, expected_fingerprint).await
    }
}
