use thiserror::Error;

pub type Result<T> = std::result::Result<T, DirectoryError>;

#[derive(Error, Debug)]
pub enum DirectoryError {
    #[error("Directory throttled the request: {0}")]
    Throttled(String),

    #[error("Referenced entity not yet visible: {0}")]
    NotYetVisible(String),

    #[error("Directory unavailable: {0}")]
    Unavailable(String),

    #[error("Assignment already exists: {0}")]
    AlreadyExists(String),

    #[error("Assignment not found: {0}")]
    NotFound(String),

    #[error("Request rejected: {0}")]
    Rejected(String),

    #[error("Name '{name}' matches {} {kind} entries", .ids.len())]
    Ambiguous {
        kind: String,
        name: String,
        ids: Vec<String>,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Snapshot error: {0}")]
    Snapshot(String),
}

impl DirectoryError {
    /// Failures that may succeed when the same call is repeated later
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            DirectoryError::Throttled(_)
                | DirectoryError::NotYetVisible(_)
                | DirectoryError::Unavailable(_)
        )
    }
}

impl From<serde_yaml::Error> for DirectoryError {
    fn from(err: serde_yaml::Error) -> Self {
        DirectoryError::Snapshot(err.to_string())
    }
}

impl From<serde_json::Error> for DirectoryError {
    fn from(err: serde_json::Error) -> Self {
        DirectoryError::Snapshot(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(DirectoryError::Throttled("rate".into()).is_transient());
        assert!(DirectoryError::NotYetVisible("group".into()).is_transient());
        assert!(DirectoryError::Unavailable("503".into()).is_transient());
        assert!(!DirectoryError::AlreadyExists("a".into()).is_transient());
        assert!(!DirectoryError::NotFound("a".into()).is_transient());
        assert!(!DirectoryError::Rejected("bad id".into()).is_transient());
        assert!(!DirectoryError::Snapshot("broken".into()).is_transient());
    }
}
