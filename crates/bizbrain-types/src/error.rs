use thiserror::Error;

use crate::workflow::TaskKind;

/// Errors from repository operations (used by trait definitions in bizbrain-core).
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database connection error")]
    Connection,

    #[error("query error: {0}")]
    Query(String),

    #[error("entity not found")]
    NotFound,

    #[error("conflict: {0}")]
    Conflict(String),
}

/// A task's stored config does not match its kind's schema.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TaskConfigError {
    #[error("{kind} task config is missing required field '{field}'")]
    Missing { kind: String, field: String },

    #[error("invalid {kind} task config: {reason}")]
    Invalid { kind: String, reason: String },
}

impl TaskConfigError {
    pub fn missing(kind: TaskKind, field: &str) -> Self {
        Self::Missing {
            kind: kind.to_string(),
            field: field.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repository_error_display() {
        let err = RepositoryError::Query("syntax error".to_string());
        assert_eq!(err.to_string(), "query error: syntax error");
    }

    #[test]
    fn test_task_config_error_display() {
        let err = TaskConfigError::missing(TaskKind::Api, "url");
        assert_eq!(err.to_string(), "api task config is missing required field 'url'");
    }
}
