pub mod configuration;
pub mod diff;
pub mod error;
pub mod executor;
pub mod plan;
pub mod policy;
pub mod retry;
pub mod session;

#[cfg(test)]
mod testing;

pub use configuration::{apply_env_overrides, ConfigurationDefinition, ReconcilerConfiguration};
pub use diff::{AssignmentDiff, DiffEngine};
pub use error::{ReconcileError, Result};
pub use executor::{ApplyExecutor, ApplyReport, OperationOutcome, OutcomeStatus};
pub use plan::{OperationKind, Plan, PlannedChange};
pub use policy::{PhaseOrder, ReconcilePolicy, RetryPolicy};
pub use retry::{with_retry, Attempted};
pub use session::{PreparedState, ReconcileSession};
