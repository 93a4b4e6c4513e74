//! Record use-case services.
//!
//! # Responsibility
//! - Orchestrate counter claims, id allocation and record writes.
//! - Expose list/get/total/create/edit/delete per record collection.
//!
//! # Invariants
//! - The counter claim happens before the record write; a failed write
//!   leaves a gap in the sequence, never a reusable number.
//! - Edits never touch the stored `id`.

pub mod error;
pub mod student_service;
pub mod teacher_service;

use crate::config::{DuplicateIdPolicy, RosterConfig};
use crate::pagination::CursorOrdering;
use crate::store::{DocumentStore, SetMode};
use error::{RecordResult, RecordServiceError};
use log::error;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

const DEFAULT_COUNTER_MAX_ATTEMPTS: u32 = 64;
const RECORD_ID_FIELD: &str = "id";

/// Behaviour switches shared by record services.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordOptions {
    pub duplicate_id_policy: DuplicateIdPolicy,
    pub counter_max_attempts: u32,
    pub teacher_cursor_ordering: CursorOrdering,
}

impl Default for RecordOptions {
    fn default() -> Self {
        Self {
            duplicate_id_policy: DuplicateIdPolicy::default(),
            counter_max_attempts: DEFAULT_COUNTER_MAX_ATTEMPTS,
            teacher_cursor_ordering: CursorOrdering::default(),
        }
    }
}

impl RecordOptions {
    pub fn from_config(config: &RosterConfig) -> Self {
        Self {
            duplicate_id_policy: config.duplicate_id_policy,
            counter_max_attempts: config.counter_max_attempts,
            teacher_cursor_ordering: config.teacher_cursor_ordering,
        }
    }
}

pub(crate) fn require_id(id: &str) -> RecordResult<&str> {
    let trimmed = id.trim();
    if trimmed.is_empty() {
        return Err(RecordServiceError::InvalidInput(
            "record id must not be blank".to_string(),
        ));
    }
    Ok(trimmed)
}

pub(crate) fn load_record<T: DeserializeOwned, S: DocumentStore + ?Sized>(
    store: &S,
    collection: &'static str,
    id: &str,
) -> RecordResult<T> {
    let id = require_id(id)?;
    match store.get(collection, id)? {
        Some(doc) => Ok(doc.decode()?),
        None => Err(RecordServiceError::NotFound {
            collection,
            id: id.to_string(),
        }),
    }
}

/// Writes a freshly allocated record according to the duplicate-id policy.
pub(crate) fn write_new_record<S: DocumentStore + ?Sized>(
    store: &S,
    policy: DuplicateIdPolicy,
    collection: &'static str,
    id: &str,
    fields: Map<String, Value>,
) -> RecordResult<()> {
    let written = match policy {
        DuplicateIdPolicy::LastWriteWins => store
            .set(collection, id, fields, SetMode::Replace)
            .map(|()| true),
        DuplicateIdPolicy::Reject => store.create(collection, id, fields),
    };

    match written {
        Ok(true) => Ok(()),
        Ok(false) => {
            error!(
                "event=record_write module=service status=error error_code=duplicate_id collection={} id={}",
                collection, id
            );
            Err(RecordServiceError::DuplicateId(id.to_string()))
        }
        Err(err) => {
            error!(
                "event=record_write module=service status=error error_code=record_write_failed collection={} id={} error={}",
                collection, id, err
            );
            Err(err.into())
        }
    }
}

/// Merges `fields` into a stored record only while it still exists.
///
/// The write is conditioned on the stored `id`, so a delete racing the edit
/// yields `NotFound` instead of a partial document.
pub(crate) fn merge_existing<S: DocumentStore + ?Sized>(
    store: &S,
    collection: &'static str,
    id: &str,
    mut fields: Map<String, Value>,
) -> RecordResult<usize> {
    fields.remove(RECORD_ID_FIELD);
    let changed_fields = fields.len();
    let expected = Value::String(id.to_string());
    if store.compare_and_set(collection, id, RECORD_ID_FIELD, &expected, fields)? {
        return Ok(changed_fields);
    }
    Err(RecordServiceError::NotFound {
        collection,
        id: id.to_string(),
    })
}

pub(crate) fn delete_record<S: DocumentStore + ?Sized>(
    store: &S,
    collection: &'static str,
    id: &str,
) -> RecordResult<()> {
    let id = require_id(id)?;
    if store.delete(collection, id)? {
        Ok(())
    } else {
        Err(RecordServiceError::NotFound {
            collection,
            id: id.to_string(),
        })
    }
}
