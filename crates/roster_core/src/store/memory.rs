//! In-process document store.
//!
//! Backs service tests without SQLite. Writes to a collection can be made to
//! fail on demand so partial-failure paths stay testable.

use super::{
    compare_values, merge_fields, Document, DocumentQuery, DocumentStore, SetMode, StoreError,
    StoreResult,
};
use parking_lot::Mutex;
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

type Collection = BTreeMap<String, Map<String, Value>>;

#[derive(Debug, Default)]
struct MemoryState {
    collections: BTreeMap<String, Collection>,
    failing_writes: BTreeSet<String>,
}

impl MemoryState {
    fn writable(&mut self, collection: &str) -> StoreResult<&mut Collection> {
        if self.failing_writes.contains(collection) {
            return Err(StoreError::Unavailable(format!(
                "writes to `{collection}` are disabled"
            )));
        }
        Ok(self.collections.entry(collection.to_string()).or_default())
    }
}

/// Mutex-guarded map of collections.
#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    state: Mutex<MemoryState>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every later write to `collection` fail with `Unavailable`.
    pub fn fail_writes_to(&self, collection: &str) {
        self.state
            .lock()
            .failing_writes
            .insert(collection.to_string());
    }

    /// Undoes [`MemoryDocumentStore::fail_writes_to`].
    pub fn restore_writes_to(&self, collection: &str) {
        self.state.lock().failing_writes.remove(collection);
    }
}

impl DocumentStore for MemoryDocumentStore {
    fn get(&self, collection: &str, id: &str) -> StoreResult<Option<Document>> {
        let state = self.state.lock();
        Ok(state
            .collections
            .get(collection)
            .and_then(|docs| docs.get(id))
            .map(|fields| Document::new(id, fields.clone())))
    }

    fn query(&self, query: &DocumentQuery) -> StoreResult<Vec<Document>> {
        query.validate()?;
        let position = query.cursor_position()?;
        let state = self.state.lock();
        let Some(docs) = state.collections.get(&query.collection) else {
            return Ok(Vec::new());
        };

        let order_by = query.order_by.as_deref();
        let mut matched: Vec<(Option<&Value>, &String, &Map<String, Value>)> = docs
            .iter()
            .filter_map(|(id, fields)| match order_by {
                Some(field) => fields
                    .get(field)
                    .filter(|value| !value.is_null())
                    .map(|value| (Some(value), id, fields)),
                None => Some((None, id, fields)),
            })
            .collect();
        matched.sort_by(|left, right| {
            compare_position((left.0, left.1.as_str()), (right.0, right.1.as_str()))
        });

        if let Some((cursor_value, cursor_id)) = position {
            matched.retain(|(value, id, _)| {
                compare_position((*value, id.as_str()), (cursor_value, cursor_id))
                    == Ordering::Greater
            });
        }

        let skip = usize::try_from(query.offset).unwrap_or(usize::MAX);
        let take = query
            .limit
            .map_or(usize::MAX, |limit| usize::try_from(limit).unwrap_or(usize::MAX));
        Ok(matched
            .into_iter()
            .skip(skip)
            .take(take)
            .map(|(_, id, fields)| Document::new(id.clone(), fields.clone()))
            .collect())
    }

    fn set(
        &self,
        collection: &str,
        id: &str,
        fields: Map<String, Value>,
        mode: SetMode,
    ) -> StoreResult<()> {
        let mut state = self.state.lock();
        let docs = state.writable(collection)?;
        match mode {
            SetMode::Replace => {
                docs.insert(id.to_string(), fields);
            }
            SetMode::Merge => merge_fields(docs.entry(id.to_string()).or_default(), fields),
        }
        Ok(())
    }

    fn create(&self, collection: &str, id: &str, fields: Map<String, Value>) -> StoreResult<bool> {
        let mut state = self.state.lock();
        let docs = state.writable(collection)?;
        if docs.contains_key(id) {
            return Ok(false);
        }
        docs.insert(id.to_string(), fields);
        Ok(true)
    }

    fn compare_and_set(
        &self,
        collection: &str,
        id: &str,
        field: &str,
        expected: &Value,
        fields: Map<String, Value>,
    ) -> StoreResult<bool> {
        let mut state = self.state.lock();
        let docs = state.writable(collection)?;
        let Some(current) = docs.get_mut(id) else {
            return Ok(false);
        };
        if current.get(field) != Some(expected) {
            return Ok(false);
        }
        merge_fields(current, fields);
        Ok(true)
    }

    fn delete(&self, collection: &str, id: &str) -> StoreResult<bool> {
        let mut state = self.state.lock();
        let docs = state.writable(collection)?;
        Ok(docs.remove(id).is_some())
    }

    fn count(&self, collection: &str) -> StoreResult<u64> {
        let state = self.state.lock();
        Ok(state
            .collections
            .get(collection)
            .map_or(0, |docs| docs.len() as u64))
    }
}

fn compare_position(left: (Option<&Value>, &str), right: (Option<&Value>, &str)) -> Ordering {
    let by_value = match (left.0, right.0) {
        (Some(a), Some(b)) => compare_values(a, b),
        _ => Ordering::Equal,
    };
    by_value.then_with(|| left.1.cmp(right.1))
}
