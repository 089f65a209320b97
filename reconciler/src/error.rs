use directory::{Assignment, DirectoryError};
use manifest::ManifestError;
use resolver::ResolutionError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ReconcileError>;

#[derive(Error, Debug)]
pub enum ReconcileError {
    #[error(transparent)]
    Manifest(#[from] ManifestError),

    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    #[error("Directory error: {0}")]
    Directory(#[from] DirectoryError),

    #[error("Drift detected: {} assignment(s) are not attributable to any rule", .0.len())]
    DriftDetected(Vec<Assignment>),

    #[error("Plan fingerprint mismatch: expected {expected}, computed {actual}")]
    FingerprintMismatch { expected: String, actual: String },

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Execution error: {0}")]
    Execution(String),
}
