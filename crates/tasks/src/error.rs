//! Error types for task operations

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TaskError {
    #[error("{0}")]
    Validation(String),

    #[error("Unknown {field}: {value}")]
    UnknownValue { field: &'static str, value: String },

    #[error("Time entry end must not be before its start")]
    InvalidTimeRange,

    #[error("Task is already completed")]
    AlreadyCompleted,

    #[error("Tasks are moved to done by completing them")]
    CompletionRequired,
}
