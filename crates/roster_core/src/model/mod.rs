//! Domain model for roster records.
//!
//! # Responsibility
//! - Define typed student/teacher records and their create/edit inputs.
//! - Define per-group counters and the identifier allocator.
//!
//! # Invariants
//! - A record `id` is derived once at creation and never recomputed.
//! - Counters are monotonic; deleting records never decrements them.

pub mod counter;
pub mod identifier;
pub mod student;
pub mod teacher;

use std::error::Error;
use std::fmt::{Display, Formatter};

/// Presence-check failure for create/edit inputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Required field is absent or blank after trim.
    MissingField(&'static str),
    /// Provided replacement value is blank after trim.
    BlankField(&'static str),
    /// Value is present but cannot be encoded into a record id.
    Malformed {
        field: &'static str,
        reason: &'static str,
    },
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingField(field) => write!(f, "missing required field `{field}`"),
            Self::BlankField(field) => write!(f, "field `{field}` must not be blank"),
            Self::Malformed { field, reason } => write!(f, "field `{field}` {reason}"),
        }
    }
}

impl Error for ValidationError {}

pub(crate) fn require(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::MissingField(field));
    }
    Ok(())
}

pub(crate) fn reject_blank(
    field: &'static str,
    value: Option<&String>,
) -> Result<(), ValidationError> {
    match value {
        Some(text) if text.trim().is_empty() => Err(ValidationError::BlankField(field)),
        _ => Ok(()),
    }
}

/// Id segments are joined with `-`, so labels embedded in ids must not contain it.
pub(crate) fn reject_separator(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.contains(identifier::ID_SEPARATOR) {
        return Err(ValidationError::Malformed {
            field,
            reason: "must not contain `-`",
        });
    }
    Ok(())
}

pub(crate) fn reject_negative(field: &'static str, value: i64) -> Result<(), ValidationError> {
    if value < 0 {
        return Err(ValidationError::Malformed {
            field,
            reason: "must not be negative",
        });
    }
    Ok(())
}
