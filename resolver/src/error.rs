use directory::{DirectoryError, TreeError};
use manifest::IgnoreKind;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ResolutionError>;

/// Why a referenced name could not be used
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceProblem {
    NotFound,
    Ambiguous { matches: usize },
}

impl fmt::Display for ReferenceProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReferenceProblem::NotFound => f.write_str("not found"),
            ReferenceProblem::Ambiguous { matches } => {
                write!(f, "ambiguous, {} entities share this name", matches)
            }
        }
    }
}

/// A rule references something the directory cannot resolve
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvalidReference {
    /// 1-based position of the rule in `rbac_rules`
    pub rule_number: usize,
    pub resource_type: IgnoreKind,
    pub resource_name: String,
    pub reason: ReferenceProblem,
}

impl fmt::Display for InvalidReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "rule #{}: {} '{}' {}",
            self.rule_number, self.resource_type, self.resource_name, self.reason
        )
    }
}

#[derive(Error, Debug)]
pub enum ResolutionError {
    #[error("{} invalid reference(s) in rules:\n{}", .0.len(), render(.0))]
    InvalidReferences(Vec<InvalidReference>),

    #[error("Invalid organization tree: {0}")]
    Tree(#[from] TreeError),

    #[error("Directory lookup failed: {0}")]
    Directory(#[from] DirectoryError),
}

fn render(references: &[InvalidReference]) -> String {
    references
        .iter()
        .map(|r| format!("  - {}", r))
        .collect::<Vec<_>>()
        .join("\n")
}
