use crate::lookup::{DirectoryLookup, Lookup};
use directory::{Assignment, OrgTree};
use manifest::{IgnoreEntry, IgnoreKind, PrincipalKind, TargetKind};
use std::collections::HashSet;
use tracing::debug;

/// Ignore entries compiled down to directory ids.
///
/// An ignored OU covers every account below it. An ignored name that matches
/// several principals or permission sets covers all of them.
#[derive(Debug, Clone, Default)]
pub struct IgnoreFilter {
    accounts: HashSet<String>,
    principals: HashSet<String>,
    permission_sets: HashSet<String>,
}

impl IgnoreFilter {
    pub fn compile(entries: &[IgnoreEntry], tree: &OrgTree, lookup: &DirectoryLookup) -> Self {
        let mut filter = Self::default();

        for entry in entries {
            match entry.target_kind {
                IgnoreKind::Ou | IgnoreKind::Account => {
                    let kind = if entry.target_kind == IgnoreKind::Ou {
                        TargetKind::Ou
                    } else {
                        TargetKind::Account
                    };
                    let matched = tree.resolve_names(kind, &entry.target_names);
                    for node in matched.nodes {
                        filter
                            .accounts
                            .extend(tree.accounts_under(node).into_iter().map(|a| a.id.clone()));
                    }
                    for name in matched.unknown {
                        debug!("Ignored {} '{}' is not in the organization", entry.target_kind, name);
                    }
                }
                IgnoreKind::User | IgnoreKind::Group => {
                    let kind = if entry.target_kind == IgnoreKind::User {
                        PrincipalKind::User
                    } else {
                        PrincipalKind::Group
                    };
                    for name in &entry.target_names {
                        filter.principals.extend(ids_of(lookup.principal(kind, name)));
                    }
                }
                IgnoreKind::PermissionSet => {
                    for name in &entry.target_names {
                        filter.permission_sets.extend(ids_of(lookup.permission_set(name)));
                    }
                }
            }
        }

        debug!(
            accounts = filter.accounts.len(),
            principals = filter.principals.len(),
            permission_sets = filter.permission_sets.len(),
            "Compiled ignore filter"
        );
        filter
    }

    /// Whether the assignment touches any ignored account, principal or permission set
    pub fn matches(&self, assignment: &Assignment) -> bool {
        self.accounts.contains(&assignment.account_id)
            || self.principals.contains(&assignment.principal_id)
            || self.permission_sets.contains(&assignment.permission_set_id)
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty() && self.principals.is_empty() && self.permission_sets.is_empty()
    }
}

fn ids_of(lookup: Lookup<'_>) -> Vec<String> {
    match lookup {
        Lookup::Found(id) => vec![id.to_string()],
        Lookup::Ambiguous(ids) => ids.to_vec(),
        Lookup::Missing => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{parse_manifest, sample_lookup, sample_tree};

    #[test]
    fn test_ou_ignore_covers_nested_accounts() {
        let tree = sample_tree();
        let lookup = sample_lookup();
        let manifest = parse_manifest(
            r#"
ignore:
  - { target_type: OU, target_names: [workloads, unknown-ou] }
rbac_rules: []
"#,
        );
        let filter = IgnoreFilter::compile(&manifest.ignore, &tree, &lookup);

        for account in ["111", "222", "333"] {
            assert!(filter.matches(&Assignment::new(account, "ps-ro", "g-devs", PrincipalKind::Group)));
        }
        assert!(!filter.matches(&Assignment::new("444", "ps-ro", "g-devs", PrincipalKind::Group)));
    }

    #[test]
    fn test_principal_and_permission_set_ignores() {
        let tree = sample_tree();
        let lookup = sample_lookup();
        let manifest = parse_manifest(
            r#"
ignore:
  - { target_type: GROUP, target_names: [contractors] }
  - { target_type: PERMISSION_SET, target_names: [Billing] }
rbac_rules: []
"#,
        );
        let filter = IgnoreFilter::compile(&manifest.ignore, &tree, &lookup);

        assert!(filter.matches(&Assignment::new("444", "ps-ro", "g-contractors", PrincipalKind::Group)));
        assert!(filter.matches(&Assignment::new("444", "ps-billing", "u-alice", PrincipalKind::User)));
        assert!(!filter.matches(&Assignment::new("444", "ps-ro", "u-alice", PrincipalKind::User)));
    }

    #[test]
    fn test_ambiguous_ignored_user_covers_every_match() {
        let tree = sample_tree();
        let lookup = sample_lookup();
        let manifest = parse_manifest(
            r#"
ignore:
  - { target_type: USER, target_names: [sam, nobody] }
rbac_rules: []
"#,
        );
        let filter = IgnoreFilter::compile(&manifest.ignore, &tree, &lookup);

        assert!(filter.matches(&Assignment::new("111", "ps-ro", "u-sam-1", PrincipalKind::User)));
        assert!(filter.matches(&Assignment::new("222", "ps-admin", "u-sam-2", PrincipalKind::User)));
        assert!(!filter.matches(&Assignment::new("111", "ps-ro", "u-alice", PrincipalKind::User)));
    }

    #[test]
    fn test_empty_without_entries() {
        let filter = IgnoreFilter::compile(&[], &sample_tree(), &sample_lookup());
        assert!(filter.is_empty());
    }
}
