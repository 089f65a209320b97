use crate::ignore::IgnoreFilter;
use crate::rule_resolver::Resolution;
use directory::{Assignment, AssignmentSet};
use manifest::RuleKind;
use std::collections::{BTreeSet, HashMap};
use tracing::info;

/// The assignments that should exist after reconciliation
#[derive(Debug, Clone, Default)]
pub struct DesiredState {
    pub assignments: AssignmentSet,
    /// Which rule bucket each desired assignment came from
    pub origins: HashMap<Assignment, RuleKind>,
    /// `(principal_id, permission_set_id)` pairs named by any rule
    pub claims: BTreeSet<(String, String)>,
    /// Grants dropped because they touch an ignored entity
    pub excluded: usize,
}

impl DesiredState {
    pub fn origin_of(&self, assignment: &Assignment) -> Option<RuleKind> {
        self.origins.get(assignment).copied()
    }

    /// Whether some rule names this assignment's principal and permission set together
    pub fn is_claimed(&self, assignment: &Assignment) -> bool {
        self.claims.contains(&assignment.grant_key())
    }

    pub fn count_of(&self, kind: RuleKind) -> usize {
        self.origins.values().filter(|k| **k == kind).count()
    }
}

pub struct DesiredStateBuilder;

impl DesiredStateBuilder {
    /// Merge resolved grants into the desired set.
    ///
    /// Explicit and implicit grants are merged with explicit taking the
    /// origin on identical tuples, then anything the ignore filter matches
    /// is removed.
    pub fn build(resolution: &Resolution, ignore: &IgnoreFilter) -> DesiredState {
        let (explicit, implicit): (Vec<_>, Vec<_>) = resolution
            .grants
            .iter()
            .partition(|grant| grant.rule_kind == RuleKind::Explicit);

        let explicit: AssignmentSet = explicit.into_iter().map(|g| g.assignment.clone()).collect();
        let implicit: AssignmentSet = implicit.into_iter().map(|g| g.assignment.clone()).collect();

        let mut merged: HashMap<Assignment, RuleKind> = implicit
            .into_iter()
            .map(|a| (a, RuleKind::Implicit))
            .collect();
        for assignment in explicit {
            merged.insert(assignment, RuleKind::Explicit);
        }

        let mut state = DesiredState {
            claims: resolution.claims.clone(),
            ..DesiredState::default()
        };
        for (assignment, origin) in merged {
            if ignore.matches(&assignment) {
                state.excluded += 1;
                continue;
            }
            state.assignments.insert(assignment.clone());
            state.origins.insert(assignment, origin);
        }

        info!(
            desired = state.assignments.len(),
            explicit = state.count_of(RuleKind::Explicit),
            implicit = state.count_of(RuleKind::Implicit),
            excluded = state.excluded,
            "Built desired state"
        );
        state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{parse_manifest, sample_lookup, sample_tree};
    use crate::rule_resolver::RuleResolver;
    use manifest::PrincipalKind;

    fn desired(yaml: &str) -> DesiredState {
        let tree = sample_tree();
        let lookup = sample_lookup();
        let manifest = parse_manifest(yaml);
        let resolution = RuleResolver::new(&tree, &lookup).resolve(&manifest).unwrap();
        let filter = IgnoreFilter::compile(&manifest.ignore, &tree, &lookup);
        DesiredStateBuilder::build(&resolution, &filter)
    }

    #[test]
    fn test_explicit_and_implicit_overlap_collapses() {
        let state = desired(
            r#"
rbac_rules:
  - { target_type: OU, target_names: [root], permission_set_name: ReadOnly, principal_name: devs, principal_type: GROUP, rule_type: IMPLICIT, nested: true }
  - { target_type: ACCOUNT, target_names: [dev-app], permission_set_name: ReadOnly, principal_name: devs, principal_type: GROUP }
"#,
        );

        assert_eq!(state.assignments.len(), 4);
        let dev = Assignment::new("111", "ps-ro", "g-devs", PrincipalKind::Group);
        let prod = Assignment::new("333", "ps-ro", "g-devs", PrincipalKind::Group);
        assert_eq!(state.origin_of(&dev), Some(RuleKind::Explicit));
        assert_eq!(state.origin_of(&prod), Some(RuleKind::Implicit));
        assert_eq!(state.count_of(RuleKind::Explicit), 1);
        assert_eq!(state.count_of(RuleKind::Implicit), 3);
    }

    #[test]
    fn test_ignore_beats_explicit_rule() {
        let state = desired(
            r#"
ignore:
  - { target_type: OU, target_names: [prod] }
rbac_rules:
  - { target_type: ACCOUNT, target_names: [prod-app, dev-app], permission_set_name: Admin, principal_name: alice, principal_type: USER }
"#,
        );

        assert_eq!(state.assignments.len(), 1);
        assert_eq!(state.excluded, 1);
        assert!(!state
            .assignments
            .contains(&Assignment::new("333", "ps-admin", "u-alice", PrincipalKind::User)));
        assert!(state.is_claimed(&Assignment::new("999", "ps-admin", "u-alice", PrincipalKind::User)));
        assert!(!state.is_claimed(&Assignment::new("111", "ps-ro", "u-alice", PrincipalKind::User)));
    }

    #[test]
    fn test_desired_state_is_deterministic() {
        let yaml = r#"
rbac_rules:
  - { target_type: OU, target_names: [workloads], permission_set_name: ReadOnly, principal_name: devs, principal_type: GROUP, nested: true }
  - { target_type: ACCOUNT, target_names: [management], permission_set_name: Billing, principal_name: alice, principal_type: USER, rule_type: IMPLICIT }
"#;
        assert_eq!(desired(yaml).assignments, desired(yaml).assignments);
    }
}
