pub mod apply;
pub mod plan;
pub mod tree;
pub mod validate;

use crate::Inputs;
use anyhow::{Context, Result};
use directory::SnapshotDirectory;
use manifest::{Manifest, ManifestLoader};
use reconciler::{Plan, ReconcilePolicy, ReconcileSession};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// Some operations of an apply failed after retries
#[derive(Error, Debug)]
#[error("{failed} of {total} operation(s) failed")]
pub struct PartialApplyFailure {
    pub failed: usize,
    pub total: usize,
}

pub(crate) fn load_manifest(path: &Path) -> Result<Manifest> {
    ManifestLoader::load_from_file(path)
        .with_context(|| format!("Failed to load manifest {}", path.display()))
}

pub(crate) fn open_directory(path: &Path) -> Result<Arc<SnapshotDirectory>> {
    let directory = SnapshotDirectory::load(path)
        .with_context(|| format!("Failed to load directory snapshot {}", path.display()))?;
    Ok(Arc::new(directory))
}

/// Load inputs, resolve the manifest and compute a labelled plan
pub(crate) async fn build_plan(
    inputs: &Inputs,
    policy: ReconcilePolicy,
) -> Result<(Arc<SnapshotDirectory>, ReconcileSession, Plan)> {
    let manifest = load_manifest(&inputs.manifest)?;
    let directory = open_directory(&inputs.directory)?;

    let session = ReconcileSession::new(directory.clone(), policy);
    let prepared = session.prepare(&manifest).await?;
    let plan = session.plan(&prepared).await?;
    Ok((directory, session, plan))
}
