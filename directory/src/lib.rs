pub mod assignment;
pub mod error;
pub mod provider;
pub mod registry;
pub mod snapshot;
pub mod tree;

pub use assignment::{Assignment, AssignmentSet};
pub use error::{DirectoryError, Result};
pub use provider::DirectoryProvider;
pub use registry::{PermissionSetRegistry, PrincipalRegistry};
pub use snapshot::{DirectorySnapshot, PermissionSetRecord, PrincipalRecord, SnapshotDirectory};
pub use tree::{NameMatch, NodeKind, OrgNode, OrgRecord, OrgTree, TreeError};
