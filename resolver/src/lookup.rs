use crate::error::{ReferenceProblem, Result};
use directory::{DirectoryError, DirectoryProvider, PermissionSetRegistry, PrincipalRegistry};
use manifest::{IgnoreKind, Manifest, PrincipalKind};
use std::collections::{BTreeSet, HashMap};
use tracing::{debug, info};

/// Result of looking up one name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup<'a> {
    Found(&'a str),
    Missing,
    /// Every id answering to the name
    Ambiguous(&'a [String]),
}

impl<'a> Lookup<'a> {
    pub fn problem(&self) -> Option<ReferenceProblem> {
        match self {
            Lookup::Found(_) => None,
            Lookup::Missing => Some(ReferenceProblem::NotFound),
            Lookup::Ambiguous(ids) => Some(ReferenceProblem::Ambiguous { matches: ids.len() }),
        }
    }
}

/// Principal and permission-set ids for every name a manifest mentions.
///
/// Each distinct name is sent to the directory exactly once.
#[derive(Debug, Default)]
pub struct DirectoryLookup {
    pub principals: PrincipalRegistry,
    pub permission_sets: PermissionSetRegistry,
    ambiguous: HashMap<(IgnoreKind, String), Vec<String>>,
}

impl DirectoryLookup {
    pub async fn run(manifest: &Manifest, provider: &dyn DirectoryProvider) -> Result<Self> {
        let mut principal_names: BTreeSet<(PrincipalKind, &str)> = manifest
            .rbac_rules
            .iter()
            .map(|rule| (rule.principal_kind, rule.principal_name.as_str()))
            .collect();
        let mut permission_set_names: BTreeSet<&str> = manifest
            .rbac_rules
            .iter()
            .map(|rule| rule.permission_set_name.as_str())
            .collect();

        principal_names.extend(manifest.ignored_names(IgnoreKind::User).map(|n| (PrincipalKind::User, n)));
        principal_names.extend(manifest.ignored_names(IgnoreKind::Group).map(|n| (PrincipalKind::Group, n)));
        permission_set_names.extend(manifest.ignored_names(IgnoreKind::PermissionSet));

        let mut lookup = Self::default();

        for (kind, name) in principal_names {
            match provider.resolve_principal(kind, name).await {
                Ok(Some(id)) => lookup.principals.insert(kind, name, id),
                Ok(None) => debug!("No {} named '{}'", kind, name),
                Err(DirectoryError::Ambiguous { ids, .. }) => {
                    lookup.record_ambiguous(kind.into(), name, ids)
                }
                Err(err) => return Err(err.into()),
            }
        }

        for name in permission_set_names {
            match provider.resolve_permission_set(name).await {
                Ok(Some(id)) => lookup.permission_sets.insert(name, id),
                Ok(None) => debug!("No permission set named '{}'", name),
                Err(DirectoryError::Ambiguous { ids, .. }) => {
                    lookup.record_ambiguous(IgnoreKind::PermissionSet, name, ids)
                }
                Err(err) => return Err(err.into()),
            }
        }

        info!(
            principals = lookup.principals.len(),
            permission_sets = lookup.permission_sets.len(),
            ambiguous = lookup.ambiguous.len(),
            "Resolved directory names"
        );
        Ok(lookup)
    }

    /// Remember the ids of every `kind` entity answering to `name`
    pub fn record_ambiguous(&mut self, kind: IgnoreKind, name: &str, ids: Vec<String>) {
        self.ambiguous.insert((kind, name.to_string()), ids);
    }

    pub fn principal(&self, kind: PrincipalKind, name: &str) -> Lookup<'_> {
        match self.principals.id_of(kind, name) {
            Some(id) => Lookup::Found(id),
            None => self.missing_or_ambiguous(kind.into(), name),
        }
    }

    pub fn permission_set(&self, name: &str) -> Lookup<'_> {
        match self.permission_sets.id_of(name) {
            Some(id) => Lookup::Found(id),
            None => self.missing_or_ambiguous(IgnoreKind::PermissionSet, name),
        }
    }

    fn missing_or_ambiguous(&self, kind: IgnoreKind, name: &str) -> Lookup<'_> {
        match self.ambiguous.get(&(kind, name.to_string())) {
            Some(ids) => Lookup::Ambiguous(ids),
            None => Lookup::Missing,
        }
    }
}
