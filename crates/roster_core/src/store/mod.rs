//! Document store contract and implementations.
//!
//! # Responsibility
//! - Define the minimal keyed-document operations record services depend on.
//! - Provide a durable SQLite store and an in-process memory store.
//!
//! # Invariants
//! - Ordered queries skip documents whose order field is missing or null.
//! - Ties on the order field are broken by document key, ascending.
//! - `start_after` resumes strictly after the cursor's `(order value, key)`.
//! - `compare_and_set` checks and writes as one atomic step.

pub mod memory;
pub mod sqlite;

use crate::db::DbError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub use memory::MemoryDocumentStore;
pub use sqlite::SqliteDocumentStore;

static FIELD_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid field name regex"));

pub type StoreResult<T> = Result<T, StoreError>;

/// Failure of a store operation.
#[derive(Debug)]
pub enum StoreError {
    /// SQLite transport or schema failure.
    Db(DbError),
    /// Query is malformed (bad field name, unusable cursor).
    InvalidQuery(String),
    /// Stored or supplied document cannot be (de)serialized.
    InvalidData(String),
    /// Backend refused the operation.
    Unavailable(String),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::InvalidQuery(message) => write!(f, "invalid document query: {message}"),
            Self::InvalidData(message) => write!(f, "invalid document data: {message}"),
            Self::Unavailable(message) => write!(f, "document store unavailable: {message}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// One keyed document inside a collection.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub fields: Map<String, Value>,
}

impl Document {
    pub fn new(id: impl Into<String>, fields: Map<String, Value>) -> Self {
        Self {
            id: id.into(),
            fields,
        }
    }

    /// Returns a top-level field, treating JSON `null` as absent.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name).filter(|value| !value.is_null())
    }

    /// Deserializes the document body into a typed record.
    pub fn decode<T: DeserializeOwned>(&self) -> StoreResult<T> {
        serde_json::from_value(Value::Object(self.fields.clone())).map_err(|err| {
            StoreError::InvalidData(format!("document `{}` does not decode: {err}", self.id))
        })
    }
}

/// Serializes a typed record into top-level document fields.
pub fn encode_fields<T: Serialize>(value: &T) -> StoreResult<Map<String, Value>> {
    match serde_json::to_value(value) {
        Ok(Value::Object(fields)) => Ok(fields),
        Ok(other) => Err(StoreError::InvalidData(format!(
            "expected a JSON object, got `{other}`"
        ))),
        Err(err) => Err(StoreError::InvalidData(err.to_string())),
    }
}

/// Write mode for [`DocumentStore::set`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetMode {
    /// Replace the whole document.
    Replace,
    /// Overwrite only the given top-level fields, creating the document if absent.
    Merge,
}

/// Ordered scan over one collection.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentQuery {
    pub collection: String,
    pub order_by: Option<String>,
    pub limit: Option<u32>,
    pub offset: u64,
    pub start_after: Option<Document>,
}

impl DocumentQuery {
    /// Starts a query over `collection`, ordered by key.
    pub fn collection(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            order_by: None,
            limit: None,
            offset: 0,
            start_after: None,
        }
    }

    pub fn order_by(mut self, field: impl Into<String>) -> Self {
        self.order_by = Some(field.into());
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = offset;
        self
    }

    pub fn start_after(mut self, cursor: Document) -> Self {
        self.start_after = Some(cursor);
        self
    }

    /// Resolves the cursor into the `(order value, key)` it resumes after.
    ///
    /// Without `order_by` the value slot is `None` and only the key counts.
    pub(crate) fn cursor_position(&self) -> StoreResult<Option<(Option<&Value>, &str)>> {
        let Some(cursor) = self.start_after.as_ref() else {
            return Ok(None);
        };
        match self.order_by.as_deref() {
            Some(field) => {
                let value = cursor.field(field).ok_or_else(|| {
                    StoreError::InvalidQuery(format!(
                        "cursor document `{}` has no `{field}` value",
                        cursor.id
                    ))
                })?;
                Ok(Some((Some(value), cursor.id.as_str())))
            }
            None => Ok(Some((None, cursor.id.as_str()))),
        }
    }

    pub(crate) fn validate(&self) -> StoreResult<()> {
        if let Some(field) = self.order_by.as_deref() {
            validate_field_name(field)?;
        }
        Ok(())
    }
}

/// Keyed document storage used by counters and record services.
///
/// Implementations must be usable through a shared reference; several
/// services may hold the same store.
pub trait DocumentStore {
    /// Reads one document.
    fn get(&self, collection: &str, id: &str) -> StoreResult<Option<Document>>;
    /// Runs an ordered scan.
    fn query(&self, query: &DocumentQuery) -> StoreResult<Vec<Document>>;
    /// Writes a document, replacing or merging per `mode`.
    fn set(
        &self,
        collection: &str,
        id: &str,
        fields: Map<String, Value>,
        mode: SetMode,
    ) -> StoreResult<()>;
    /// Inserts a document only if the key is free. Returns whether it was written.
    fn create(&self, collection: &str, id: &str, fields: Map<String, Value>) -> StoreResult<bool>;
    /// Merges `fields` only if the document exists and `field` equals `expected`.
    ///
    /// Returns whether the write happened.
    fn compare_and_set(
        &self,
        collection: &str,
        id: &str,
        field: &str,
        expected: &Value,
        fields: Map<String, Value>,
    ) -> StoreResult<bool>;
    /// Removes a document. Returns whether it existed.
    fn delete(&self, collection: &str, id: &str) -> StoreResult<bool>;
    /// Counts every document in a collection.
    fn count(&self, collection: &str) -> StoreResult<u64>;
}

impl<S: DocumentStore + ?Sized> DocumentStore for &S {
    fn get(&self, collection: &str, id: &str) -> StoreResult<Option<Document>> {
        (**self).get(collection, id)
    }

    fn query(&self, query: &DocumentQuery) -> StoreResult<Vec<Document>> {
        (**self).query(query)
    }

    fn set(
        &self,
        collection: &str,
        id: &str,
        fields: Map<String, Value>,
        mode: SetMode,
    ) -> StoreResult<()> {
        (**self).set(collection, id, fields, mode)
    }

    fn create(&self, collection: &str, id: &str, fields: Map<String, Value>) -> StoreResult<bool> {
        (**self).create(collection, id, fields)
    }

    fn compare_and_set(
        &self,
        collection: &str,
        id: &str,
        field: &str,
        expected: &Value,
        fields: Map<String, Value>,
    ) -> StoreResult<bool> {
        (**self).compare_and_set(collection, id, field, expected, fields)
    }

    fn delete(&self, collection: &str, id: &str) -> StoreResult<bool> {
        (**self).delete(collection, id)
    }

    fn count(&self, collection: &str) -> StoreResult<u64> {
        (**self).count(collection)
    }
}

pub(crate) fn validate_field_name(field: &str) -> StoreResult<()> {
    if FIELD_NAME_RE.is_match(field) {
        Ok(())
    } else {
        Err(StoreError::InvalidQuery(format!(
            "unsupported field name `{field}`"
        )))
    }
}

pub(crate) fn merge_fields(target: &mut Map<String, Value>, fields: Map<String, Value>) {
    for (key, value) in fields {
        target.insert(key, value);
    }
}

/// Orders two field values the way SQLite orders `json_extract` results:
/// numbers (booleans as 0/1) before text, arrays and objects as their JSON text.
pub(crate) fn compare_values(left: &Value, right: &Value) -> Ordering {
    match (sort_key(left), sort_key(right)) {
        (SortKey::Number(a), SortKey::Number(b)) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
        (SortKey::Number(_), SortKey::Text(_)) => Ordering::Less,
        (SortKey::Text(_), SortKey::Number(_)) => Ordering::Greater,
        (SortKey::Text(a), SortKey::Text(b)) => a.cmp(&b),
    }
}

enum SortKey {
    Number(f64),
    Text(String),
}

fn sort_key(value: &Value) -> SortKey {
    match value {
        Value::Bool(flag) => SortKey::Number(if *flag { 1.0 } else { 0.0 }),
        Value::Number(number) => SortKey::Number(number.as_f64().unwrap_or(f64::NAN)),
        Value::String(text) => SortKey::Text(text.clone()),
        Value::Null => SortKey::Text(String::new()),
        other => SortKey::Text(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::{compare_values, validate_field_name, Document, DocumentQuery};
    use serde_json::{json, Map};
    use std::cmp::Ordering;

    #[test]
    fn field_names_reject_json_path_syntax() {
        assert!(validate_field_name("last_name").is_ok());
        assert!(validate_field_name("last_name') --").is_err());
        assert!(validate_field_name("a.b").is_err());
        assert!(validate_field_name("").is_err());
    }

    #[test]
    fn numbers_sort_before_text() {
        assert_eq!(compare_values(&json!(10), &json!("1")), Ordering::Less);
        assert_eq!(compare_values(&json!(2), &json!(10)), Ordering::Less);
        assert_eq!(compare_values(&json!("b"), &json!("a")), Ordering::Greater);
        assert_eq!(compare_values(&json!(true), &json!(1)), Ordering::Equal);
    }

    #[test]
    fn cursor_without_order_field_is_rejected() {
        let cursor = Document::new("t1", Map::new());
        let query = DocumentQuery::collection("teachers")
            .order_by("last_name")
            .start_after(cursor);
        assert!(query.cursor_position().is_err());
    }
}
