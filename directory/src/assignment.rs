use manifest::PrincipalKind;
use serde::{Deserialize, Serialize};
use std::collections::hash_set;
use std::collections::HashSet;
use std::fmt;

/// A single grant of a permission set to a principal on an account
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Assignment {
    pub account_id: String,
    pub permission_set_id: String,
    pub principal_id: String,
    pub principal_kind: PrincipalKind,
}

impl Assignment {
    pub fn new(
        account_id: impl Into<String>,
        permission_set_id: impl Into<String>,
        principal_id: impl Into<String>,
        principal_kind: PrincipalKind,
    ) -> Self {
        Self {
            account_id: account_id.into(),
            permission_set_id: permission_set_id.into(),
            principal_id: principal_id.into(),
            principal_kind,
        }
    }

    /// The (principal, permission set) pair this assignment grants
    pub fn grant_key(&self) -> (String, String) {
        (self.principal_id.clone(), self.permission_set_id.clone())
    }
}

impl fmt::Display for Assignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} -> {} on {}",
            self.principal_kind, self.principal_id, self.permission_set_id, self.account_id
        )
    }
}

/// Set of assignments with constant-time membership.
///
/// Serializes as a sorted list so persisted snapshots and plans are stable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<Assignment>", into = "Vec<Assignment>")]
pub struct AssignmentSet {
    inner: HashSet<Assignment>,
}

impl AssignmentSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false when the assignment was already present
    pub fn insert(&mut self, assignment: Assignment) -> bool {
        self.inner.insert(assignment)
    }

    pub fn remove(&mut self, assignment: &Assignment) -> bool {
        self.inner.remove(assignment)
    }

    pub fn contains(&self, assignment: &Assignment) -> bool {
        self.inner.contains(assignment)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn iter(&self) -> hash_set::Iter<'_, Assignment> {
        self.inner.iter()
    }

    /// Members in canonical order
    pub fn sorted(&self) -> Vec<&Assignment> {
        let mut items: Vec<&Assignment> = self.inner.iter().collect();
        items.sort();
        items
    }

    /// Members of `self` missing from `other`, in canonical order
    pub fn difference(&self, other: &AssignmentSet) -> Vec<Assignment> {
        let mut items: Vec<Assignment> = self.inner.difference(&other.inner).cloned().collect();
        items.sort();
        items
    }
}

impl FromIterator<Assignment> for AssignmentSet {
    fn from_iter<I: IntoIterator<Item = Assignment>>(iter: I) -> Self {
        Self {
            inner: iter.into_iter().collect(),
        }
    }
}

impl Extend<Assignment> for AssignmentSet {
    fn extend<I: IntoIterator<Item = Assignment>>(&mut self, iter: I) {
        self.inner.extend(iter);
    }
}

impl IntoIterator for AssignmentSet {
    type Item = Assignment;
    type IntoIter = hash_set::IntoIter<Assignment>;

    fn into_iter(self) -> Self::IntoIter {
        self.inner.into_iter()
    }
}

impl<'a> IntoIterator for &'a AssignmentSet {
    type Item = &'a Assignment;
    type IntoIter = hash_set::Iter<'a, Assignment>;

    fn into_iter(self) -> Self::IntoIter {
        self.inner.iter()
    }
}

impl From<Vec<Assignment>> for AssignmentSet {
    fn from(items: Vec<Assignment>) -> Self {
        items.into_iter().collect()
    }
}

impl From<AssignmentSet> for Vec<Assignment> {
    fn from(set: AssignmentSet) -> Self {
        let mut items: Vec<Assignment> = set.inner.into_iter().collect();
        items.sort();
        items
    }
}
