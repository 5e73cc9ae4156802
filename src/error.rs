use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, StudyError>;

/// Failures surfaced by the study core. Validation variants never leave
/// partial state behind.
#[derive(Debug, Error)]
pub enum StudyError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("invalid submission: {0}")]
    InvalidSubmission(String),

    #[error("select at least two logs to merge ({selected} selected)")]
    InsufficientSelection { selected: usize },

    #[error("no log entry with id {0}")]
    NotFound(u64),

    /// Only from `Controller::flush`; routine saves log and continue.
    #[error("persistence unavailable: {0}")]
    PersistenceUnavailable(#[from] StorageError),
}

/// Errors from the durable key-value backend.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("io error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("encoding snapshot: {0}")]
    Encode(#[from] serde_json::Error),

    /// The record parsed but describes a log that could not have been built.
    #[error("invalid snapshot: {0}")]
    Invalid(String),
}

/// Errors from writing an export document.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("io error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("csv: {0}")]
    Csv(#[from] csv::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insufficient_selection_reports_count() {
        let err = StudyError::InsufficientSelection { selected: 1 };
        assert_eq!(
            err.to_string(),
            "select at least two logs to merge (1 selected)"
        );
    }

    #[test]
    fn storage_errors_convert_into_persistence_unavailable() {
        let json_err = serde_json::from_str::<u32>("nope").unwrap_err();
        let err: StudyError = StorageError::from(json_err).into();
        assert!(matches!(err, StudyError::PersistenceUnavailable(_)));
    }
}
