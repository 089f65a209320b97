use crate::diff::DiffEngine;
use crate::policy::PhaseOrder;
use chrono::{DateTime, Utc};
use directory::{Assignment, AssignmentSet, OrgTree};
use manifest::RuleKind;
use resolver::{DesiredState, DirectoryLookup, IgnoreFilter};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fmt;
use tracing::info;

/// Kind of directory mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Create,
    Delete,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationKind::Create => f.write_str("CREATE"),
            OperationKind::Delete => f.write_str("DELETE"),
        }
    }
}

/// An assignment in a plan, with display names where they are known
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedChange {
    #[serde(flatten)]
    pub assignment: Assignment,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub principal_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permission_set_name: Option<String>,
    /// Rule bucket a create came from
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin: Option<RuleKind>,
}

impl PlannedChange {
    pub fn new(assignment: Assignment) -> Self {
        Self {
            assignment,
            account_name: None,
            principal_name: None,
            permission_set_name: None,
            origin: None,
        }
    }

    fn label(&mut self, tree: &OrgTree, lookup: &DirectoryLookup) {
        self.account_name = tree.node(&self.assignment.account_id).map(|n| n.name.clone());
        self.principal_name = lookup
            .principals
            .name_of(&self.assignment.principal_id)
            .map(str::to_string);
        self.permission_set_name = lookup
            .permission_sets
            .name_of(&self.assignment.permission_set_id)
            .map(str::to_string);
    }

    pub fn account_label(&self) -> &str {
        self.account_name.as_deref().unwrap_or(&self.assignment.account_id)
    }

    pub fn principal_label(&self) -> &str {
        self.principal_name.as_deref().unwrap_or(&self.assignment.principal_id)
    }

    pub fn permission_set_label(&self) -> &str {
        self.permission_set_name
            .as_deref()
            .unwrap_or(&self.assignment.permission_set_id)
    }
}

/// Ordered change set produced by comparing desired and observed state
#[derive(Debug, Clone, Serialize)]
pub struct Plan {
    /// SHA-256 over the create and delete lists
    pub fingerprint: String,
    pub generated_at: DateTime<Utc>,
    pub to_create: Vec<PlannedChange>,
    pub to_delete: Vec<PlannedChange>,
    /// Deletes whose principal/permission-set pair no rule names
    pub drift: Vec<PlannedChange>,
    /// Observed assignments left untouched because they are ignored
    pub ignored: Vec<PlannedChange>,
    pub unchanged: usize,
}

impl Plan {
    pub fn build(desired: &DesiredState, observed: &AssignmentSet, ignore: &IgnoreFilter) -> Self {
        let diff = DiffEngine::compare(&desired.assignments, observed, ignore);
        let fingerprint = Self::fingerprint(&diff.to_create, &diff.to_delete);

        let to_create = diff
            .to_create
            .into_iter()
            .map(|assignment| {
                let origin = desired.origin_of(&assignment);
                PlannedChange {
                    origin,
                    ..PlannedChange::new(assignment)
                }
            })
            .collect();
        let drift = diff
            .to_delete
            .iter()
            .filter(|assignment| !desired.is_claimed(assignment))
            .cloned()
            .map(PlannedChange::new)
            .collect();
        let to_delete = diff.to_delete.into_iter().map(PlannedChange::new).collect();
        let ignored = diff.ignored.into_iter().map(PlannedChange::new).collect();

        let plan = Self {
            fingerprint,
            generated_at: Utc::now(),
            to_create,
            to_delete,
            drift,
            ignored,
            unchanged: diff.unchanged,
        };

        info!(
            creates = plan.to_create.len(),
            deletes = plan.to_delete.len(),
            drift = plan.drift.len(),
            ignored = plan.ignored.len(),
            unchanged = plan.unchanged,
            fingerprint = %plan.short_fingerprint(),
            "Built reconciliation plan"
        );
        plan
    }

    /// Fill in account, principal and permission-set names
    pub fn label(&mut self, tree: &OrgTree, lookup: &DirectoryLookup) {
        for change in self
            .to_create
            .iter_mut()
            .chain(self.to_delete.iter_mut())
            .chain(self.drift.iter_mut())
            .chain(self.ignored.iter_mut())
        {
            change.label(tree, lookup);
        }
    }

    /// Deterministic digest of the mutations a plan would perform
    pub fn fingerprint(to_create: &[Assignment], to_delete: &[Assignment]) -> String {
        let mut creates: Vec<&Assignment> = to_create.iter().collect();
        let mut deletes: Vec<&Assignment> = to_delete.iter().collect();
        creates.sort();
        deletes.sort();

        let mut hasher = Sha256::new();
        for (kind, items) in [(OperationKind::Create, creates), (OperationKind::Delete, deletes)] {
            for a in items {
                hasher.update(
                    format!(
                        "{}\t{}\t{}\t{}\t{}\n",
                        kind, a.account_id, a.permission_set_id, a.principal_id, a.principal_kind
                    )
                    .as_bytes(),
                );
            }
        }
        hex::encode(hasher.finalize())
    }

    pub fn short_fingerprint(&self) -> &str {
        &self.fingerprint[..self.fingerprint.len().min(12)]
    }

    pub fn is_empty(&self) -> bool {
        self.to_create.is_empty() && self.to_delete.is_empty()
    }

    pub fn operation_count(&self) -> usize {
        self.to_create.len() + self.to_delete.len()
    }

    /// Mutation phases in execution order
    pub fn phases(&self, order: PhaseOrder) -> [(OperationKind, &[PlannedChange]); 2] {
        let creates = (OperationKind::Create, self.to_create.as_slice());
        let deletes = (OperationKind::Delete, self.to_delete.as_slice());
        match order {
            PhaseOrder::CreatesFirst => [creates, deletes],
            PhaseOrder::DeletesFirst => [deletes, creates],
        }
    }

    pub fn drift_assignments(&self) -> Vec<Assignment> {
        self.drift.iter().map(|c| c.assignment.clone()).collect()
    }

    /// Human-readable summary of the plan
    pub fn summary(&self) -> String {
        let mut summary = String::new();
        summary.push_str(&format!("Plan {}\n", self.short_fingerprint()));
        summary.push_str(&format!("  Create: {}\n", self.to_create.len()));
        summary.push_str(&format!("  Delete: {}\n", self.to_delete.len()));
        summary.push_str(&format!("  Unchanged: {}\n", self.unchanged));
        summary.push_str(&format!("  Ignored: {}\n", self.ignored.len()));
        if !self.drift.is_empty() {
            summary.push_str(&format!("  Drift: {}\n", self.drift.len()));
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use manifest::PrincipalKind;

    fn grant(account: &str, permission_set: &str, principal: &str) -> Assignment {
        Assignment::new(account, permission_set, principal, PrincipalKind::Group)
    }

    fn desired(assignments: Vec<Assignment>, claims: &[(&str, &str)]) -> DesiredState {
        let mut state = DesiredState::default();
        for a in assignments {
            state.origins.insert(a.clone(), RuleKind::Explicit);
            state.assignments.insert(a);
        }
        state.claims = claims
            .iter()
            .map(|(p, ps)| (p.to_string(), ps.to_string()))
            .collect();
        state
    }

    #[test]
    fn test_drift_is_unclaimed_deletes() {
        let desired = desired(vec![grant("111", "ps-ro", "g-devs")], &[("g-devs", "ps-ro")]);
        let observed: AssignmentSet = vec![
            grant("111", "ps-ro", "g-devs"),
            grant("222", "ps-ro", "g-devs"),
            grant("222", "ps-admin", "g-rogue"),
        ]
        .into();

        let plan = Plan::build(&desired, &observed, &IgnoreFilter::default());
        assert!(plan.to_create.is_empty());
        assert_eq!(plan.to_delete.len(), 2);
        assert_eq!(plan.drift_assignments(), vec![grant("222", "ps-admin", "g-rogue")]);
        assert_eq!(plan.unchanged, 1);
    }

    #[test]
    fn test_creates_carry_origin() {
        let desired = desired(vec![grant("111", "ps-ro", "g-devs")], &[("g-devs", "ps-ro")]);
        let plan = Plan::build(&desired, &AssignmentSet::new(), &IgnoreFilter::default());
        assert_eq!(plan.to_create[0].origin, Some(RuleKind::Explicit));
        assert_eq!(plan.to_create[0].account_label(), "111");
    }

    #[test]
    fn test_fingerprint_is_order_independent_and_sensitive() {
        let a = grant("111", "ps-ro", "g-devs");
        let b = grant("222", "ps-ro", "g-devs");

        let forward = Plan::fingerprint(&[a.clone(), b.clone()], &[]);
        let reverse = Plan::fingerprint(&[b.clone(), a.clone()], &[]);
        assert_eq!(forward, reverse);
        assert_eq!(forward.len(), 64);

        let as_delete = Plan::fingerprint(&[a.clone()], &[b.clone()]);
        assert_ne!(forward, as_delete);
    }

    #[test]
    fn test_serialized_changes_are_flat() {
        let desired = desired(vec![grant("111", "ps-ro", "g-devs")], &[("g-devs", "ps-ro")]);
        let plan = Plan::build(&desired, &AssignmentSet::new(), &IgnoreFilter::default());

        let json = serde_json::to_value(&plan).unwrap();
        let change = &json["to_create"][0];
        assert_eq!(change["account_id"], "111");
        assert_eq!(change["principal_kind"], "GROUP");
        assert_eq!(change["origin"], "EXPLICIT");
        assert!(change.get("account_name").is_none());
    }

    #[test]
    fn test_phase_order() {
        let desired = desired(vec![grant("111", "ps-ro", "g-devs")], &[]);
        let observed: AssignmentSet = vec![grant("222", "ps-ro", "g-devs")].into();
        let plan = Plan::build(&desired, &observed, &IgnoreFilter::default());

        let kinds: Vec<OperationKind> = plan.phases(PhaseOrder::DeletesFirst).iter().map(|(k, _)| *k).collect();
        assert_eq!(kinds, vec![OperationKind::Delete, OperationKind::Create]);
        let kinds: Vec<OperationKind> = plan.phases(PhaseOrder::CreatesFirst).iter().map(|(k, _)| *k).collect();
        assert_eq!(kinds, vec![OperationKind::Create, OperationKind::Delete]);
    }
}
