use manifest::{Inherit, TargetKind};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use thiserror::Error;
use tracing::debug;

/// Kind of node in the organization hierarchy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NodeKind {
    Root,
    Ou,
    Account,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            NodeKind::Root => "ROOT",
            NodeKind::Ou => "OU",
            NodeKind::Account => "ACCOUNT",
        };
        f.write_str(label)
    }
}

/// One row of the flat organization listing returned by a directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrgRecord {
    pub id: String,
    pub name: String,
    pub kind: NodeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    /// Account lifecycle status, absent means ACTIVE
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl OrgRecord {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        kind: NodeKind,
        parent_id: Option<&str>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind,
            parent_id: parent_id.map(str::to_string),
            status: None,
        }
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    pub fn is_active(&self) -> bool {
        self.status
            .as_deref()
            .map_or(true, |status| status.eq_ignore_ascii_case("ACTIVE"))
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TreeError {
    #[error("Organization listing has no ROOT node")]
    NoRoot,

    #[error("Organization listing has more than one ROOT node: {0:?}")]
    MultipleRoots(Vec<String>),

    #[error("Duplicate node id '{0}'")]
    DuplicateId(String),

    #[error("ROOT node '{0}' must not have a parent")]
    RootHasParent(String),

    #[error("Node '{0}' has no parent")]
    MissingParentId(String),

    #[error("Node '{id}' references unknown parent '{parent_id}'")]
    UnknownParent { id: String, parent_id: String },

    #[error("Account '{0}' cannot have children")]
    AccountHasChildren(String),

    #[error("Nodes not reachable from the root: {0:?}")]
    Unreachable(Vec<String>),
}

/// A node of the arena. `parent` and `children` are arena indices.
#[derive(Debug, Clone)]
pub struct OrgNode {
    pub id: String,
    pub name: String,
    pub kind: NodeKind,
    parent: Option<usize>,
    children: Vec<usize>,
}

impl OrgNode {
    pub fn is_account(&self) -> bool {
        self.kind == NodeKind::Account
    }
}

/// Outcome of matching target names against the tree
#[derive(Debug, Default)]
pub struct NameMatch<'a> {
    pub nodes: Vec<&'a OrgNode>,
    pub unknown: Vec<String>,
}

/// Arena-backed OU/account hierarchy
#[derive(Debug, Clone)]
pub struct OrgTree {
    nodes: Vec<OrgNode>,
    index: HashMap<String, usize>,
    root: usize,
}

impl OrgTree {
    /// Build a tree from a flat listing, dropping accounts that are not ACTIVE
    pub fn build(records: Vec<OrgRecord>) -> Result<Self, TreeError> {
        let (active, inactive): (Vec<OrgRecord>, Vec<OrgRecord>) = records
            .into_iter()
            .partition(|record| record.kind != NodeKind::Account || record.is_active());
        if !inactive.is_empty() {
            debug!(excluded = inactive.len(), "Skipping accounts that are not ACTIVE");
        }

        let roots: Vec<&OrgRecord> = active.iter().filter(|r| r.kind == NodeKind::Root).collect();
        let root_record = match roots.as_slice() {
            [] => return Err(TreeError::NoRoot),
            [root] => *root,
            many => {
                return Err(TreeError::MultipleRoots(
                    many.iter().map(|r| r.id.clone()).collect(),
                ))
            }
        };
        if root_record.parent_id.is_some() {
            return Err(TreeError::RootHasParent(root_record.id.clone()));
        }

        let mut nodes = Vec::with_capacity(active.len());
        let mut index = HashMap::with_capacity(active.len());
        for record in &active {
            if index.insert(record.id.clone(), nodes.len()).is_some() {
                return Err(TreeError::DuplicateId(record.id.clone()));
            }
            nodes.push(OrgNode {
                id: record.id.clone(),
                name: record.name.clone(),
                kind: record.kind,
                parent: None,
                children: Vec::new(),
            });
        }

        for (idx, record) in active.iter().enumerate() {
            if record.kind == NodeKind::Root {
                continue;
            }
            let parent_id = record
                .parent_id
                .as_ref()
                .ok_or_else(|| TreeError::MissingParentId(record.id.clone()))?;
            let parent = *index.get(parent_id).ok_or_else(|| TreeError::UnknownParent {
                id: record.id.clone(),
                parent_id: parent_id.clone(),
            })?;
            if nodes[parent].kind == NodeKind::Account {
                return Err(TreeError::AccountHasChildren(nodes[parent].id.clone()));
            }
            nodes[idx].parent = Some(parent);
            nodes[parent].children.push(idx);
        }

        let root = index[&root_record.id];
        let tree = Self { nodes, index, root };
        tree.check_reachable()?;

        debug!(nodes = tree.nodes.len(), "Built organization tree");
        Ok(tree)
    }

    fn check_reachable(&self) -> Result<(), TreeError> {
        let mut seen = HashSet::with_capacity(self.nodes.len());
        let mut stack = vec![self.root];
        while let Some(idx) = stack.pop() {
            if seen.insert(idx) {
                stack.extend(self.nodes[idx].children.iter().copied());
            }
        }

        if seen.len() == self.nodes.len() {
            return Ok(());
        }
        let mut orphans: Vec<String> = (0..self.nodes.len())
            .filter(|idx| !seen.contains(idx))
            .map(|idx| self.nodes[idx].id.clone())
            .collect();
        orphans.sort();
        Err(TreeError::Unreachable(orphans))
    }

    pub fn root(&self) -> &OrgNode {
        &self.nodes[self.root]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: &str) -> Option<&OrgNode> {
        self.index.get(id).map(|&idx| &self.nodes[idx])
    }

    pub fn parent_of(&self, node: &OrgNode) -> Option<&OrgNode> {
        node.parent.map(|idx| &self.nodes[idx])
    }

    pub fn children_of<'a>(&'a self, node: &'a OrgNode) -> impl Iterator<Item = &'a OrgNode> + 'a {
        node.children.iter().map(move |&idx| &self.nodes[idx])
    }

    /// All ACCOUNT nodes in pre-order
    pub fn accounts(&self) -> Vec<&OrgNode> {
        self.accounts_under(self.root())
    }

    /// Nodes whose kind matches `kind` and whose name is in `names`.
    ///
    /// The ROOT node answers to OU lookups. Names that match nothing are
    /// returned in `unknown`.
    pub fn resolve_names(&self, kind: TargetKind, names: &[String]) -> NameMatch<'_> {
        let mut result = NameMatch::default();
        let mut seen = HashSet::new();

        for name in names {
            let mut found = false;
            for node in self.nodes.iter().filter(|n| n.name == *name) {
                let kind_matches = match kind {
                    TargetKind::Ou => matches!(node.kind, NodeKind::Ou | NodeKind::Root),
                    TargetKind::Account => node.kind == NodeKind::Account,
                };
                if kind_matches {
                    found = true;
                    if seen.insert(node.id.as_str()) {
                        result.nodes.push(node);
                    }
                }
            }
            if !found {
                result.unknown.push(name.clone());
            }
        }

        result
    }

    /// Accounts a rule targeting `node` reaches under `inherit`
    pub fn descendants_of<'a>(&'a self, node: &'a OrgNode, inherit: Inherit) -> Vec<&'a OrgNode> {
        if node.is_account() {
            return vec![node];
        }
        match inherit {
            Inherit::None => Vec::new(),
            Inherit::Limited => self
                .children_of(node)
                .filter(|child| child.is_account())
                .collect(),
            Inherit::Full => self.accounts_under(node),
        }
    }

    /// Every account transitively below `node` (or `node` itself if it is one)
    pub fn accounts_under(&self, node: &OrgNode) -> Vec<&OrgNode> {
        self.walk_from(node)
            .into_iter()
            .map(|(_, n)| n)
            .filter(|n| n.is_account())
            .collect()
    }

    /// Ancestors of `node` from its parent up to the root
    pub fn ancestors_of(&self, node: &OrgNode) -> Vec<&OrgNode> {
        let mut ancestors = Vec::new();
        let mut current = node.parent;
        while let Some(idx) = current {
            ancestors.push(&self.nodes[idx]);
            current = self.nodes[idx].parent;
        }
        ancestors
    }

    /// Pre-order traversal of the whole tree with depth, children in listing order
    pub fn walk(&self) -> Vec<(usize, &OrgNode)> {
        self.walk_from(self.root())
    }

    fn walk_from(&self, start: &OrgNode) -> Vec<(usize, &OrgNode)> {
        let start = match self.index.get(&start.id) {
            Some(&idx) => idx,
            None => return Vec::new(),
        };
        let mut out = Vec::new();
        let mut stack = vec![(0usize, start)];
        while let Some((depth, idx)) = stack.pop() {
            out.push((depth, &self.nodes[idx]));
            for &child in self.nodes[idx].children.iter().rev() {
                stack.push((depth + 1, child));
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    /// root
    /// ├── workloads (OU)
    /// │   ├── prod (OU)
    /// │   │   └── 333 prod-app
    /// │   ├── 111 dev-app
    /// │   └── 222 test-app
    /// └── 444 management
    fn sample_records() -> Vec<OrgRecord> {
        vec![
            OrgRecord::new("r-root", "root", NodeKind::Root, None),
            OrgRecord::new("ou-work", "workloads", NodeKind::Ou, Some("r-root")),
            OrgRecord::new("ou-prod", "prod", NodeKind::Ou, Some("ou-work")),
            OrgRecord::new("333", "prod-app", NodeKind::Account, Some("ou-prod")),
            OrgRecord::new("111", "dev-app", NodeKind::Account, Some("ou-work")),
            OrgRecord::new("222", "test-app", NodeKind::Account, Some("ou-work")),
            OrgRecord::new("444", "management", NodeKind::Account, Some("r-root")),
        ]
    }

    fn ids(nodes: &[&OrgNode]) -> Vec<String> {
        let mut ids: Vec<String> = nodes.iter().map(|n| n.id.clone()).collect();
        ids.sort();
        ids
    }

    #[rstest]
    #[case(Inherit::None, vec![])]
    #[case(Inherit::Limited, vec!["111", "222"])]
    #[case(Inherit::Full, vec!["111", "222", "333"])]
    fn test_descendants_by_inherit_mode(#[case] inherit: Inherit, #[case] expected: Vec<&str>) {
        let tree = OrgTree::build(sample_records()).unwrap();
        let workloads = tree.node("ou-work").unwrap();
        assert_eq!(ids(&tree.descendants_of(workloads, inherit)), expected);
    }

    #[test]
    fn test_account_target_ignores_inherit() {
        let tree = OrgTree::build(sample_records()).unwrap();
        let account = tree.node("111").unwrap();
        for inherit in [Inherit::None, Inherit::Limited, Inherit::Full] {
            assert_eq!(ids(&tree.descendants_of(account, inherit)), vec!["111"]);
        }
    }

    #[test]
    fn test_root_matches_ou_lookup_and_unknowns_are_reported() {
        let tree = OrgTree::build(sample_records()).unwrap();
        let names = vec!["root".to_string(), "ghost".to_string(), "dev-app".to_string()];

        let matched = tree.resolve_names(TargetKind::Ou, &names);
        assert_eq!(ids(&matched.nodes), vec!["r-root"]);
        assert_eq!(matched.unknown, vec!["ghost".to_string(), "dev-app".to_string()]);

        let accounts = tree.resolve_names(TargetKind::Account, &names);
        assert_eq!(ids(&accounts.nodes), vec!["111"]);
        assert_eq!(accounts.unknown.len(), 2);
    }

    #[test]
    fn test_ancestors_and_accounts_under() {
        let tree = OrgTree::build(sample_records()).unwrap();
        let prod_app = tree.node("333").unwrap();
        let ancestors: Vec<&str> = tree.ancestors_of(prod_app).iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ancestors, vec!["ou-prod", "ou-work", "r-root"]);
        assert_eq!(ids(&tree.accounts()), vec!["111", "222", "333", "444"]);
    }

    #[test]
    fn test_walk_is_preorder_in_listing_order() {
        let tree = OrgTree::build(sample_records()).unwrap();
        let walked: Vec<(usize, &str)> = tree.walk().iter().map(|(d, n)| (*d, n.id.as_str())).collect();
        assert_eq!(
            walked,
            vec![
                (0, "r-root"),
                (1, "ou-work"),
                (2, "ou-prod"),
                (3, "333"),
                (2, "111"),
                (2, "222"),
                (1, "444"),
            ]
        );
    }

    #[test]
    fn test_inactive_accounts_excluded() {
        let mut records = sample_records();
        records[4] = records[4].clone().with_status("SUSPENDED");
        let tree = OrgTree::build(records).unwrap();
        assert!(tree.node("111").is_none());
        assert_eq!(
            ids(&tree.descendants_of(tree.node("ou-work").unwrap(), Inherit::Limited)),
            vec!["222"]
        );
    }

    #[test]
    fn test_construction_errors() {
        let no_root = sample_records().into_iter().skip(1).collect();
        assert_eq!(OrgTree::build(no_root).unwrap_err(), TreeError::NoRoot);

        let mut two_roots = sample_records();
        two_roots.push(OrgRecord::new("r-other", "other", NodeKind::Root, None));
        assert!(matches!(OrgTree::build(two_roots), Err(TreeError::MultipleRoots(_))));

        let mut duplicate = sample_records();
        duplicate.push(OrgRecord::new("111", "copy", NodeKind::Account, Some("r-root")));
        assert_eq!(
            OrgTree::build(duplicate).unwrap_err(),
            TreeError::DuplicateId("111".to_string())
        );

        let mut dangling = sample_records();
        dangling.push(OrgRecord::new("555", "lost", NodeKind::Account, Some("ou-missing")));
        assert!(matches!(OrgTree::build(dangling), Err(TreeError::UnknownParent { .. })));

        let mut under_account = sample_records();
        under_account.push(OrgRecord::new("ou-bad", "bad", NodeKind::Ou, Some("444")));
        assert_eq!(
            OrgTree::build(under_account).unwrap_err(),
            TreeError::AccountHasChildren("444".to_string())
        );
    }

    #[test]
    fn test_cycle_is_unreachable() {
        let mut records = sample_records();
        records.push(OrgRecord::new("ou-a", "a", NodeKind::Ou, Some("ou-b")));
        records.push(OrgRecord::new("ou-b", "b", NodeKind::Ou, Some("ou-a")));
        assert_eq!(
            OrgTree::build(records).unwrap_err(),
            TreeError::Unreachable(vec!["ou-a".to_string(), "ou-b".to_string()])
        );
    }
}
