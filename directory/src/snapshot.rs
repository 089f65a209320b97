use crate::assignment::{Assignment, AssignmentSet};
use crate::error::{DirectoryError, Result};
use crate::provider::DirectoryProvider;
use crate::tree::{NodeKind, OrgRecord};
use async_trait::async_trait;
use manifest::PrincipalKind;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrincipalRecord {
    pub id: String,
    pub name: String,
    pub kind: PrincipalKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionSetRecord {
    pub id: String,
    pub name: String,
}

/// Serialized state of a directory
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectorySnapshot {
    pub org: Vec<OrgRecord>,
    #[serde(default)]
    pub principals: Vec<PrincipalRecord>,
    #[serde(default)]
    pub permission_sets: Vec<PermissionSetRecord>,
    #[serde(default)]
    pub assignments: AssignmentSet,
}

impl DirectorySnapshot {
    fn active_account_ids(&self) -> HashSet<&str> {
        self.org
            .iter()
            .filter(|record| record.kind == NodeKind::Account && record.is_active())
            .map(|record| record.id.as_str())
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SnapshotFormat {
    Yaml,
    Json,
}

impl SnapshotFormat {
    fn from_path(path: &Path) -> Result<Self> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("yaml") | Some("yml") => Ok(SnapshotFormat::Yaml),
            Some("json") => Ok(SnapshotFormat::Json),
            _ => Err(DirectoryError::Snapshot(format!(
                "Unsupported snapshot format: {}",
                path.display()
            ))),
        }
    }
}

/// In-memory directory backed by a snapshot file.
///
/// Mutations only touch memory until [`SnapshotDirectory::save`] is called.
pub struct SnapshotDirectory {
    path: Option<PathBuf>,
    state: RwLock<DirectorySnapshot>,
}

impl SnapshotDirectory {
    pub fn new(snapshot: DirectorySnapshot) -> Self {
        Self {
            path: None,
            state: RwLock::new(snapshot),
        }
    }

    /// Load a snapshot from a `.yaml`, `.yml` or `.json` file
    pub fn load(path: &Path) -> Result<Self> {
        debug!("Loading directory snapshot from: {:?}", path);

        let format = SnapshotFormat::from_path(path)?;
        let content = std::fs::read_to_string(path)?;
        let snapshot: DirectorySnapshot = match format {
            SnapshotFormat::Yaml => serde_yaml::from_str(&content)?,
            SnapshotFormat::Json => serde_json::from_str(&content)?,
        };

        info!(
            org = snapshot.org.len(),
            principals = snapshot.principals.len(),
            permission_sets = snapshot.permission_sets.len(),
            assignments = snapshot.assignments.len(),
            "Loaded directory snapshot from {:?}",
            path
        );

        Ok(Self {
            path: Some(path.to_path_buf()),
            state: RwLock::new(snapshot),
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Write the current state back to the file it was loaded from
    pub async fn save(&self) -> Result<()> {
        let path = self
            .path
            .as_deref()
            .ok_or_else(|| DirectoryError::Snapshot("Snapshot has no backing file".to_string()))?;
        self.save_to(path).await
    }

    pub async fn save_to(&self, path: &Path) -> Result<()> {
        let format = SnapshotFormat::from_path(path)?;
        let state = self.state.read().await;
        let content = match format {
            SnapshotFormat::Yaml => serde_yaml::to_string(&*state)?,
            SnapshotFormat::Json => serde_json::to_string_pretty(&*state)?,
        };
        tokio::fs::write(path, content).await?;

        info!(assignments = state.assignments.len(), "Saved directory snapshot to {:?}", path);
        Ok(())
    }

    /// Copy of the current in-memory state
    pub async fn snapshot(&self) -> DirectorySnapshot {
        self.state.read().await.clone()
    }
}

#[async_trait]
impl DirectoryProvider for SnapshotDirectory {
    async fn list_org_tree(&self) -> Result<Vec<OrgRecord>> {
        Ok(self.state.read().await.org.clone())
    }

    async fn list_accounts_under(&self, ou_id: &str) -> Result<Vec<String>> {
        let state = self.state.read().await;
        Ok(state
            .org
            .iter()
            .filter(|record| {
                record.kind == NodeKind::Account
                    && record.is_active()
                    && record.parent_id.as_deref() == Some(ou_id)
            })
            .map(|record| record.id.clone())
            .collect())
    }

    async fn resolve_principal(&self, kind: PrincipalKind, name: &str) -> Result<Option<String>> {
        let state = self.state.read().await;
        let matches: Vec<&PrincipalRecord> = state
            .principals
            .iter()
            .filter(|p| p.kind == kind && p.name == name)
            .collect();

        match matches.as_slice() {
            [] => Ok(None),
            [principal] => Ok(Some(principal.id.clone())),
            many => Err(DirectoryError::Ambiguous {
                kind: kind.to_string(),
                name: name.to_string(),
                ids: many.iter().map(|p| p.id.clone()).collect(),
            }),
        }
    }

    async fn resolve_permission_set(&self, name: &str) -> Result<Option<String>> {
        let state = self.state.read().await;
        let matches: Vec<&PermissionSetRecord> =
            state.permission_sets.iter().filter(|p| p.name == name).collect();

        match matches.as_slice() {
            [] => Ok(None),
            [permission_set] => Ok(Some(permission_set.id.clone())),
            many => Err(DirectoryError::Ambiguous {
                kind: "PERMISSION_SET".to_string(),
                name: name.to_string(),
                ids: many.iter().map(|p| p.id.clone()).collect(),
            }),
        }
    }

    async fn list_current_assignments(&self) -> Result<AssignmentSet> {
        let state = self.state.read().await;
        let active = state.active_account_ids();
        Ok(state
            .assignments
            .iter()
            .filter(|a| active.contains(a.account_id.as_str()))
            .cloned()
            .collect())
    }

    async fn create_assignment(&self, assignment: &Assignment) -> Result<()> {
        let mut state = self.state.write().await;

        if !state.active_account_ids().contains(assignment.account_id.as_str()) {
            return Err(DirectoryError::Rejected(format!(
                "unknown or inactive account '{}'",
                assignment.account_id
            )));
        }
        if !state
            .principals
            .iter()
            .any(|p| p.id == assignment.principal_id && p.kind == assignment.principal_kind)
        {
            return Err(DirectoryError::Rejected(format!(
                "unknown {} '{}'",
                assignment.principal_kind, assignment.principal_id
            )));
        }
        if !state
            .permission_sets
            .iter()
            .any(|p| p.id == assignment.permission_set_id)
        {
            return Err(DirectoryError::Rejected(format!(
                "unknown permission set '{}'",
                assignment.permission_set_id
            )));
        }

        if !state.assignments.insert(assignment.clone()) {
            return Err(DirectoryError::AlreadyExists(assignment.to_string()));
        }
        debug!("Created assignment {}", assignment);
        Ok(())
    }

    async fn delete_assignment(&self, assignment: &Assignment) -> Result<()> {
        let mut state = self.state.write().await;
        if !state.assignments.remove(assignment) {
            return Err(DirectoryError::NotFound(assignment.to_string()));
        }
        debug!("Deleted assignment {}", assignment);
        Ok(())
    }
}
