use directory::{Assignment, AssignmentSet};
use resolver::IgnoreFilter;
use tracing::debug;

/// Set difference between desired and observed assignments
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssignmentDiff {
    /// Desired but not observed
    pub to_create: Vec<Assignment>,
    /// Observed, not desired and not ignored
    pub to_delete: Vec<Assignment>,
    /// Observed assignments left alone because they match the ignore filter
    pub ignored: Vec<Assignment>,
    /// Present on both sides
    pub unchanged: usize,
}

impl AssignmentDiff {
    pub fn is_empty(&self) -> bool {
        self.to_create.is_empty() && self.to_delete.is_empty()
    }
}

pub struct DiffEngine;

impl DiffEngine {
    /// Compare desired against observed. All lists come back in canonical order.
    pub fn compare(
        desired: &AssignmentSet,
        observed: &AssignmentSet,
        ignore: &IgnoreFilter,
    ) -> AssignmentDiff {
        let to_create = desired.difference(observed);
        let (ignored, to_delete): (Vec<Assignment>, Vec<Assignment>) = observed
            .difference(desired)
            .into_iter()
            .partition(|assignment| ignore.matches(assignment));
        let unchanged = observed.len() - ignored.len() - to_delete.len();

        debug!(
            creates = to_create.len(),
            deletes = to_delete.len(),
            ignored = ignored.len(),
            unchanged,
            "Computed assignment diff"
        );

        AssignmentDiff {
            to_create,
            to_delete,
            ignored,
            unchanged,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use manifest::PrincipalKind;

    fn grant(account: &str, principal: &str) -> Assignment {
        Assignment::new(account, "ps-ro", principal, PrincipalKind::Group)
    }

    #[test]
    fn test_identical_sets_produce_empty_diff() {
        let state: AssignmentSet = vec![grant("111", "g-1"), grant("222", "g-1")].into();
        let diff = DiffEngine::compare(&state, &state, &IgnoreFilter::default());
        assert!(diff.is_empty());
        assert_eq!(diff.unchanged, 2);
    }

    #[test]
    fn test_creates_and_deletes() {
        let desired: AssignmentSet = vec![grant("111", "g-1"), grant("222", "g-1")].into();
        let observed: AssignmentSet = vec![grant("222", "g-1"), grant("333", "g-1")].into();

        let diff = DiffEngine::compare(&desired, &observed, &IgnoreFilter::default());
        assert_eq!(diff.to_create, vec![grant("111", "g-1")]);
        assert_eq!(diff.to_delete, vec![grant("333", "g-1")]);
        assert_eq!(diff.unchanged, 1);
    }

    #[test]
    fn test_empty_observed_creates_everything() {
        let desired: AssignmentSet = vec![grant("111", "g-1")].into();
        let diff = DiffEngine::compare(&desired, &AssignmentSet::new(), &IgnoreFilter::default());
        assert_eq!(diff.to_create.len(), 1);
        assert!(diff.to_delete.is_empty());
    }
}
