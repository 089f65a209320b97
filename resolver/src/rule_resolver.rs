use crate::error::{InvalidReference, ReferenceProblem, ResolutionError, Result};
use crate::lookup::{DirectoryLookup, Lookup};
use directory::{Assignment, OrgTree};
use manifest::{IgnoreKind, Inherit, Manifest, Rule, RuleKind, TargetKind};
use serde::Serialize;
use std::collections::BTreeSet;
use tracing::{debug, warn};

/// One (account, permission set, principal) grant produced by a rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedGrant {
    pub assignment: Assignment,
    pub account_name: String,
    pub permission_set_name: String,
    pub principal_name: String,
    pub rule_kind: RuleKind,
    /// 1-based position of the producing rule
    pub rule_number: usize,
}

/// Everything the rules of a manifest expand to
#[derive(Debug, Default)]
pub struct Resolution {
    /// Sorted by assignment, then rule number
    pub grants: Vec<ResolvedGrant>,
    /// `(principal_id, permission_set_id)` pairs named by at least one rule
    pub claims: BTreeSet<(String, String)>,
}

/// Expands manifest rules over the organization tree.
///
/// Dangling names are collected across all rules and reported together,
/// except names covered by an ignore entry of the same kind, which quietly
/// contribute nothing.
pub struct RuleResolver<'a> {
    tree: &'a OrgTree,
    lookup: &'a DirectoryLookup,
}

impl<'a> RuleResolver<'a> {
    pub fn new(tree: &'a OrgTree, lookup: &'a DirectoryLookup) -> Self {
        Self { tree, lookup }
    }

    pub fn resolve(&self, manifest: &Manifest) -> Result<Resolution> {
        let mut resolution = Resolution::default();
        let mut invalid = Vec::new();

        for (idx, rule) in manifest.rbac_rules.iter().enumerate() {
            self.resolve_rule(idx + 1, rule, manifest, &mut resolution, &mut invalid);
        }

        if !invalid.is_empty() {
            return Err(ResolutionError::InvalidReferences(invalid));
        }

        resolution.grants.sort_by(|a, b| {
            a.assignment
                .cmp(&b.assignment)
                .then(a.rule_number.cmp(&b.rule_number))
        });
        debug!(
            grants = resolution.grants.len(),
            claims = resolution.claims.len(),
            "Resolved rules"
        );
        Ok(resolution)
    }

    fn resolve_rule(
        &self,
        rule_number: usize,
        rule: &Rule,
        manifest: &Manifest,
        resolution: &mut Resolution,
        invalid: &mut Vec<InvalidReference>,
    ) {
        let mut report = |kind: IgnoreKind, name: &str, problem: ReferenceProblem| {
            if manifest.is_ignored(kind, name) {
                debug!("Rule #{}: {} '{}' is ignored", rule_number, kind, name);
            } else {
                invalid.push(InvalidReference {
                    rule_number,
                    resource_type: kind,
                    resource_name: name.to_string(),
                    reason: problem,
                });
            }
        };

        let principal_id = match self.lookup.principal(rule.principal_kind, &rule.principal_name) {
            Lookup::Found(id) => Some(id),
            other => {
                if let Some(problem) = other.problem() {
                    report(rule.principal_kind.into(), &rule.principal_name, problem);
                }
                None
            }
        };

        let permission_set_id = match self.lookup.permission_set(&rule.permission_set_name) {
            Lookup::Found(id) => Some(id),
            other => {
                if let Some(problem) = other.problem() {
                    report(IgnoreKind::PermissionSet, &rule.permission_set_name, problem);
                }
                None
            }
        };

        let targets = self.tree.resolve_names(rule.target_kind, &rule.target_names);
        for name in &targets.unknown {
            report(rule.target_kind.into(), name, ReferenceProblem::NotFound);
        }

        let (principal_id, permission_set_id) = match (principal_id, permission_set_id) {
            (Some(p), Some(ps)) => (p, ps),
            _ => return,
        };
        resolution
            .claims
            .insert((principal_id.to_string(), permission_set_id.to_string()));

        for node in targets.nodes {
            if rule.target_kind == TargetKind::Ou && rule.inherit == Inherit::None {
                warn!(
                    "Rule #{} targets OU '{}' with inherit NONE and grants nothing",
                    rule_number, node.name
                );
                continue;
            }
            for account in self.tree.descendants_of(node, rule.inherit) {
                resolution.grants.push(ResolvedGrant {
                    assignment: Assignment::new(
                        account.id.as_str(),
                        permission_set_id,
                        principal_id,
                        rule.principal_kind,
                    ),
                    account_name: account.name.clone(),
                    permission_set_name: rule.permission_set_name.clone(),
                    principal_name: rule.principal_name.clone(),
                    rule_kind: rule.rule_kind,
                    rule_number,
                });
            }
        }
    }
}
