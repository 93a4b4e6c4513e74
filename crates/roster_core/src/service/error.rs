//! Caller-facing error taxonomy for record services.

use crate::model::ValidationError;
use crate::repo::counter_repo::CounterError;
use crate::store::StoreError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type RecordResult<T> = Result<T, RecordServiceError>;

/// Failure of a student/teacher operation.
#[derive(Debug)]
pub enum RecordServiceError {
    /// Requested record does not exist.
    NotFound {
        collection: &'static str,
        id: String,
    },
    /// Counter for the record's group was never provisioned.
    DependencyMissing { group_key: String },
    /// Required identifying input is missing or blank.
    InvalidInput(String),
    /// Allocated id is taken and the duplicate policy is `reject`.
    DuplicateId(String),
    /// Counter claim kept losing to concurrent creates.
    CounterContention { group_key: String, attempts: u32 },
    /// Underlying store failed; not retried.
    StoreFailure(StoreError),
}

impl Display for RecordServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound { collection, id } => write!(f, "{collection}/{id} not found"),
            Self::DependencyMissing { group_key } => {
                write!(f, "counter classes/{group_key} must be provisioned first")
            }
            Self::InvalidInput(message) => write!(f, "invalid input: {message}"),
            Self::DuplicateId(id) => write!(f, "record id already exists: {id}"),
            Self::CounterContention {
                group_key,
                attempts,
            } => write!(
                f,
                "counter classes/{group_key} contended after {attempts} attempts"
            ),
            Self::StoreFailure(err) => write!(f, "store failure: {err}"),
        }
    }
}

impl Error for RecordServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::StoreFailure(err) => Some(err),
            _ => None,
        }
    }
}

impl From<StoreError> for RecordServiceError {
    fn from(value: StoreError) -> Self {
        Self::StoreFailure(value)
    }
}

impl From<ValidationError> for RecordServiceError {
    fn from(value: ValidationError) -> Self {
        Self::InvalidInput(value.to_string())
    }
}

impl From<CounterError> for RecordServiceError {
    fn from(value: CounterError) -> Self {
        match value {
            CounterError::Missing(group_key) => Self::DependencyMissing { group_key },
            CounterError::Contention {
                group_key,
                attempts,
            } => Self::CounterContention {
                group_key,
                attempts,
            },
            CounterError::InvalidData(message) => {
                Self::StoreFailure(StoreError::InvalidData(message))
            }
            CounterError::Store(err) => Self::StoreFailure(err),
        }
    }
}
