//! Counter repository over the `classes` collection.
//!
//! # Responsibility
//! - Read and provision per-group counter documents.
//! - Hand out sequence numbers with an atomic compare-and-set claim.
//!
//! # Invariants
//! - A claim returns the pre-increment `total` and stores `total + 1`.
//! - A claim never succeeds for two callers with the same value.
//! - Missing counter documents are never created implicitly by a claim.

use crate::model::counter::{Counter, CLASSES_COLLECTION, COUNTER_TOTAL_FIELD};
use crate::store::{DocumentStore, SetMode, StoreError};
use log::{debug, warn};
use serde_json::{json, Map, Value};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type CounterResult<T> = Result<T, CounterError>;

/// Counter repository error.
#[derive(Debug)]
pub enum CounterError {
    /// Counter document for the group was never provisioned.
    Missing(String),
    /// Every claim attempt lost its compare-and-set race.
    Contention { group_key: String, attempts: u32 },
    /// Counter document exists but has no usable `total`.
    InvalidData(String),
    Store(StoreError),
}

impl Display for CounterError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Missing(group_key) => write!(f, "counter not provisioned: {group_key}"),
            Self::Contention {
                group_key,
                attempts,
            } => write!(
                f,
                "counter `{group_key}` still contended after {attempts} attempts"
            ),
            Self::InvalidData(message) => write!(f, "invalid counter data: {message}"),
            Self::Store(err) => write!(f, "{err}"),
        }
    }
}

impl Error for CounterError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Store(err) => Some(err),
            _ => None,
        }
    }
}

impl From<StoreError> for CounterError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

/// Counter access bound to one document store.
pub struct CounterRepository<'s, S: DocumentStore + ?Sized> {
    store: &'s S,
}

impl<'s, S: DocumentStore + ?Sized> CounterRepository<'s, S> {
    pub fn new(store: &'s S) -> Self {
        Self { store }
    }

    /// Reads the counter for `group_key`, `None` when not provisioned.
    pub fn get(&self, group_key: &str) -> CounterResult<Option<Counter>> {
        let Some(doc) = self.store.get(CLASSES_COLLECTION, group_key)? else {
            return Ok(None);
        };
        let total = doc
            .field(COUNTER_TOTAL_FIELD)
            .and_then(Value::as_u64)
            .ok_or_else(|| {
                CounterError::InvalidData(format!(
                    "classes/{group_key} has no non-negative integer `total`"
                ))
            })?;
        Ok(Some(Counter {
            group_key: group_key.to_string(),
            total,
        }))
    }

    /// Creates or resets a counter. Operator path; record creation never calls it.
    ///
    /// Other fields on the counter document are left untouched.
    pub fn provision(&self, group_key: &str, total: u64) -> CounterResult<Counter> {
        self.store.set(
            CLASSES_COLLECTION,
            group_key,
            total_fields(total),
            SetMode::Merge,
        )?;
        debug!(
            "event=counter_provision module=counter status=ok group={} total={}",
            group_key, total
        );
        Ok(Counter {
            group_key: group_key.to_string(),
            total,
        })
    }

    /// Claims the next sequence number for `group_key`.
    ///
    /// Re-reads and retries when another writer advanced the counter between
    /// the read and the conditional write, up to `max_attempts` times.
    ///
    /// # Errors
    /// - `Missing` when the counter document does not exist.
    /// - `Contention` when every attempt lost the race.
    pub fn claim_next(&self, group_key: &str, max_attempts: u32) -> CounterResult<u64> {
        let attempts = max_attempts.max(1);
        for attempt in 1..=attempts {
            let counter = self
                .get(group_key)?
                .ok_or_else(|| CounterError::Missing(group_key.to_string()))?;
            let next = counter.total.checked_add(1).ok_or_else(|| {
                CounterError::InvalidData(format!("classes/{group_key} total overflow"))
            })?;

            let claimed = self.store.compare_and_set(
                CLASSES_COLLECTION,
                group_key,
                COUNTER_TOTAL_FIELD,
                &json!(counter.total),
                total_fields(next),
            )?;
            if claimed {
                debug!(
                    "event=counter_claim module=counter status=ok group={} sequence={} attempt={}",
                    group_key, counter.total, attempt
                );
                return Ok(counter.total);
            }
            debug!(
                "event=counter_claim module=counter status=conflict group={} seen={} attempt={}",
                group_key, counter.total, attempt
            );
        }

        warn!(
            "event=counter_claim module=counter status=error error_code=counter_contention group={} attempts={}",
            group_key, attempts
        );
        Err(CounterError::Contention {
            group_key: group_key.to_string(),
            attempts,
        })
    }
}

fn total_fields(total: u64) -> Map<String, Value> {
    let mut fields = Map::new();
    fields.insert(COUNTER_TOTAL_FIELD.to_string(), json!(total));
    fields
}
