use crate::plan::OperationKind;
use async_trait::async_trait;
use directory::{Assignment, AssignmentSet, DirectoryError, DirectoryProvider, OrgRecord};
use directory::Result as DirectoryResult;
use manifest::PrincipalKind;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// In-memory directory that records mutations and can be scripted to fail
#[derive(Default)]
pub(crate) struct ScriptedDirectory {
    pub state: Mutex<AssignmentSet>,
    pub calls: Mutex<Vec<(OperationKind, Assignment)>>,
    failures: Mutex<HashMap<Assignment, VecDeque<DirectoryError>>>,
    delay: Option<Duration>,
    in_flight: AtomicUsize,
    pub peak_in_flight: AtomicUsize,
}

impl ScriptedDirectory {
    pub fn with_state(assignments: Vec<Assignment>) -> Self {
        Self {
            state: Mutex::new(assignments.into()),
            ..Self::default()
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Queue errors returned before the assignment's real behavior kicks in
    pub fn fail(&self, assignment: &Assignment, errors: Vec<DirectoryError>) {
        self.failures
            .lock()
            .unwrap()
            .insert(assignment.clone(), errors.into());
    }

    pub fn mutation_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    async fn mutate(&self, kind: OperationKind, assignment: &Assignment) -> DirectoryResult<()> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        self.calls.lock().unwrap().push((kind, assignment.clone()));

        let scripted = self
            .failures
            .lock()
            .unwrap()
            .get_mut(assignment)
            .and_then(|queue| queue.pop_front());
        if let Some(err) = scripted {
            return Err(err);
        }

        let mut state = self.state.lock().unwrap();
        match kind {
            OperationKind::Create if !state.insert(assignment.clone()) => {
                Err(DirectoryError::AlreadyExists(assignment.to_string()))
            }
            OperationKind::Delete if !state.remove(assignment) => {
                Err(DirectoryError::NotFound(assignment.to_string()))
            }
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl DirectoryProvider for ScriptedDirectory {
    async fn list_org_tree(&self) -> DirectoryResult<Vec<OrgRecord>> {
        Ok(Vec::new())
    }

    async fn list_accounts_under(&self, _ou_id: &str) -> DirectoryResult<Vec<String>> {
        Ok(Vec::new())
    }

    async fn resolve_principal(
        &self,
        _kind: PrincipalKind,
        _name: &str,
    ) -> DirectoryResult<Option<String>> {
        Ok(None)
    }

    async fn resolve_permission_set(&self, _name: &str) -> DirectoryResult<Option<String>> {
        Ok(None)
    }

    async fn list_current_assignments(&self) -> DirectoryResult<AssignmentSet> {
        Ok(self.state.lock().unwrap().clone())
    }

    async fn create_assignment(&self, assignment: &Assignment) -> DirectoryResult<()> {
        self.mutate(OperationKind::Create, assignment).await
    }

    async fn delete_assignment(&self, assignment: &Assignment) -> DirectoryResult<()> {
        self.mutate(OperationKind::Delete, assignment).await
    }
}
