use crate::error::{ReconcileError, Result};
use crate::plan::{OperationKind, Plan, PlannedChange};
use crate::policy::ReconcilePolicy;
use crate::retry::with_retry;
use chrono::{DateTime, Utc};
use directory::{Assignment, DirectoryError, DirectoryProvider};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{Mutex, Semaphore};
use tracing::{debug, error, info, warn};

/// What happened to one planned operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    Applied,
    /// The directory already matched (create found it present, delete found it gone)
    AlreadyInSync,
    SkippedDryRun,
    Failed,
}

/// Result of a single operation
#[derive(Debug, Clone, Serialize)]
pub struct OperationOutcome {
    pub operation: OperationKind,
    pub change: PlannedChange,
    pub status: OutcomeStatus,
    pub attempts: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub execution_time_ms: u128,
}

impl OperationOutcome {
    fn skipped(operation: OperationKind, change: &PlannedChange) -> Self {
        let now = Utc::now();
        Self {
            operation,
            change: change.clone(),
            status: OutcomeStatus::SkippedDryRun,
            attempts: 0,
            message: None,
            started_at: now,
            finished_at: now,
            execution_time_ms: 0,
        }
    }
}

/// Report of applying a plan
#[derive(Debug, Clone, Serialize)]
pub struct ApplyReport {
    pub fingerprint: String,
    pub dry_run: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub total_operations: usize,
    pub applied: usize,
    pub already_in_sync: usize,
    pub skipped: usize,
    pub failed: usize,
    pub execution_time_ms: u128,
    pub outcomes: Vec<OperationOutcome>,
}

impl ApplyReport {
    fn from_outcomes(
        plan: &Plan,
        dry_run: bool,
        started_at: DateTime<Utc>,
        elapsed_ms: u128,
        mut outcomes: Vec<OperationOutcome>,
    ) -> Self {
        outcomes.sort_by(|a, b| {
            a.operation
                .cmp(&b.operation)
                .then_with(|| a.change.assignment.cmp(&b.change.assignment))
        });
        let count = |status: OutcomeStatus| outcomes.iter().filter(|o| o.status == status).count();

        Self {
            fingerprint: plan.fingerprint.clone(),
            dry_run,
            started_at,
            finished_at: Utc::now(),
            total_operations: outcomes.len(),
            applied: count(OutcomeStatus::Applied),
            already_in_sync: count(OutcomeStatus::AlreadyInSync),
            skipped: count(OutcomeStatus::SkippedDryRun),
            failed: count(OutcomeStatus::Failed),
            execution_time_ms: elapsed_ms,
            outcomes,
        }
    }

    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }

    pub fn failures(&self) -> impl Iterator<Item = &OperationOutcome> {
        self.outcomes.iter().filter(|o| o.status == OutcomeStatus::Failed)
    }
}

/// Executes plans against a directory
pub struct ApplyExecutor {
    provider: Arc<dyn DirectoryProvider>,
    policy: ReconcilePolicy,
}

impl ApplyExecutor {
    pub fn new(provider: Arc<dyn DirectoryProvider>, policy: ReconcilePolicy) -> Self {
        Self { provider, policy }
    }

    pub fn policy(&self) -> &ReconcilePolicy {
        &self.policy
    }

    /// Apply a plan.
    ///
    /// Refuses to start when `expected_fingerprint` does not match the plan or
    /// when the guardrail is on and the plan contains drift. Individual
    /// operation failures are recorded in the report and never abort the run.
    pub async fn apply(&self, plan: &Plan, expected_fingerprint: Option<&str>) -> Result<ApplyReport> {
        if let Some(expected) = expected_fingerprint {
            let expected = expected.trim().to_ascii_lowercase();
            if expected != plan.fingerprint && !Self::is_prefix_match(&expected, &plan.fingerprint) {
                return Err(ReconcileError::FingerprintMismatch {
                    expected,
                    actual: plan.fingerprint.clone(),
                });
            }
        }

        if self.policy.guardrail && !plan.drift.is_empty() {
            warn!(drift = plan.drift.len(), "Guardrail blocked apply");
            return Err(ReconcileError::DriftDetected(plan.drift_assignments()));
        }

        let started_at = Utc::now();
        let start_time = Instant::now();

        info!(
            "Applying {} operations (dry_run: {}, ordering: {}, concurrency: {})",
            plan.operation_count(),
            self.policy.dry_run,
            self.policy.ordering,
            self.policy.effective_concurrency()
        );

        if self.policy.dry_run {
            let outcomes = plan
                .phases(self.policy.ordering)
                .iter()
                .flat_map(|(kind, changes)| {
                    changes.iter().map(move |change| OperationOutcome::skipped(*kind, change))
                })
                .collect();
            return Ok(ApplyReport::from_outcomes(
                plan,
                true,
                started_at,
                start_time.elapsed().as_millis(),
                outcomes,
            ));
        }

        let outcomes = Arc::new(Mutex::new(Vec::with_capacity(plan.operation_count())));
        for (kind, changes) in plan.phases(self.policy.ordering) {
            self.run_phase(kind, changes, &outcomes).await?;
        }

        let outcomes = std::mem::take(&mut *outcomes.lock().await);
        let report = ApplyReport::from_outcomes(
            plan,
            false,
            started_at,
            start_time.elapsed().as_millis(),
            outcomes,
        );

        info!(
            applied = report.applied,
            already_in_sync = report.already_in_sync,
            failed = report.failed,
            "Apply finished in {}ms",
            report.execution_time_ms
        );
        Ok(report)
    }

    fn is_prefix_match(expected: &str, actual: &str) -> bool {
        expected.len() >= 8 && actual.starts_with(expected)
    }

    /// Run one phase to completion before returning
    async fn run_phase(
        &self,
        kind: OperationKind,
        changes: &[PlannedChange],
        outcomes: &Arc<Mutex<Vec<OperationOutcome>>>,
    ) -> Result<()> {
        if changes.is_empty() {
            return Ok(());
        }
        debug!("Starting {} phase with {} operation(s)", kind, changes.len());

        let semaphore = Arc::new(Semaphore::new(self.policy.effective_concurrency()));
        let mut handles = Vec::with_capacity(changes.len());

        for change in changes {
            let permit = semaphore
                .clone()
                .acquire_owned()
                .await
                .map_err(|e| ReconcileError::Execution(e.to_string()))?;

            let provider = self.provider.clone();
            let policy = self.policy.clone();
            let change = change.clone();
            let outcomes = outcomes.clone();
            let assignment = change.assignment.clone();

            let handle = tokio::spawn(async move {
                let _permit = permit;
                let outcome = execute_one(provider, &policy, kind, change).await;
                outcomes.lock().await.push(outcome);
            });
            handles.push((assignment, handle));
        }

        for (assignment, handle) in handles {
            if let Err(e) = handle.await {
                error!("{} task for {} did not complete: {}", kind, assignment, e);
                let now = Utc::now();
                outcomes.lock().await.push(OperationOutcome {
                    operation: kind,
                    change: PlannedChange::new(assignment),
                    status: OutcomeStatus::Failed,
                    attempts: 0,
                    message: Some(e.to_string()),
                    started_at: now,
                    finished_at: now,
                    execution_time_ms: 0,
                });
            }
        }

        debug!("{} phase complete", kind);
        Ok(())
    }
}

async fn execute_one(
    provider: Arc<dyn DirectoryProvider>,
    policy: &ReconcilePolicy,
    kind: OperationKind,
    change: PlannedChange,
) -> OperationOutcome {
    let started_at = Utc::now();
    let start_time = Instant::now();
    let label = format!("{} {}", kind, change.assignment);

    let attempted = with_retry(&policy.retry, policy.call_timeout(), &label, || {
        let provider = provider.clone();
        let assignment: Assignment = change.assignment.clone();
        async move {
            match kind {
                OperationKind::Create => provider.create_assignment(&assignment).await,
                OperationKind::Delete => provider.delete_assignment(&assignment).await,
            }
        }
    })
    .await;

    let (status, message) = match (kind, attempted.result) {
        (_, Ok(())) => {
            debug!("{} succeeded", label);
            (OutcomeStatus::Applied, None)
        }
        (OperationKind::Create, Err(DirectoryError::AlreadyExists(_)))
        | (OperationKind::Delete, Err(DirectoryError::NotFound(_))) => {
            debug!("{} already in sync", label);
            (OutcomeStatus::AlreadyInSync, None)
        }
        (_, Err(e)) => {
            error!("{} failed: {}", label, e);
            (OutcomeStatus::Failed, Some(e.to_string()))
        }
    };

    OperationOutcome {
        operation: kind,
        change,
        status,
        attempts: attempted.attempts,
        message,
        started_at,
        finished_at: Utc::now(),
        execution_time_ms: start_time.elapsed().as_millis(),
    }
}
