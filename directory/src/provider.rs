use crate::assignment::{Assignment, AssignmentSet};
use crate::error::Result;
use crate::tree::OrgRecord;
use async_trait::async_trait;
use manifest::PrincipalKind;

/// Access to the live directory service.
///
/// Name lookups return `Ok(None)` when nothing matches and
/// [`DirectoryError::Ambiguous`](crate::DirectoryError::Ambiguous), carrying
/// every matching id, when more than one entity answers to the name. Mutations report
/// `AlreadyExists`/`NotFound` rather than succeeding silently so callers can
/// tell the difference.
#[async_trait]
pub trait DirectoryProvider: Send + Sync {
    /// Flat listing of the organization, root included
    async fn list_org_tree(&self) -> Result<Vec<OrgRecord>>;

    /// Ids of the ACTIVE accounts directly under an OU
    async fn list_accounts_under(&self, ou_id: &str) -> Result<Vec<String>>;

    async fn resolve_principal(&self, kind: PrincipalKind, name: &str) -> Result<Option<String>>;

    async fn resolve_permission_set(&self, name: &str) -> Result<Option<String>>;

    /// Every assignment currently present on ACTIVE accounts
    async fn list_current_assignments(&self) -> Result<AssignmentSet>;

    async fn create_assignment(&self, assignment: &Assignment) -> Result<()>;

    async fn delete_assignment(&self, assignment: &Assignment) -> Result<()>;
}
