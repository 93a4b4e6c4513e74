//! SQLite-backed document store.
//!
//! # Responsibility
//! - Persist documents as JSON bodies in the `documents` table.
//! - Translate `DocumentQuery` into ordered, paged SQL scans.
//!
//! # Invariants
//! - Read-modify-write paths (`Merge`, `compare_and_set`) run inside an
//!   `IMMEDIATE` transaction, so concurrent connections serialize on them.
//! - Order fields are validated identifiers before being spliced into SQL.

use super::{
    merge_fields, Document, DocumentQuery, DocumentStore, SetMode, StoreError, StoreResult,
};
use crate::db::migrations::latest_version;
use crate::db::{schema_version, DbError};
use rusqlite::types::Value as SqlValue;
use rusqlite::{
    params, params_from_iter, Connection, OptionalExtension, Transaction, TransactionBehavior,
};
use serde_json::{Map, Value};

/// Document store over one migrated SQLite connection.
pub struct SqliteDocumentStore<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteDocumentStore<'conn> {
    /// Wraps a connection returned by `open_db`/`open_db_in_memory`.
    ///
    /// # Errors
    /// - `DbError::SchemaNotReady` when the connection was never migrated.
    pub fn try_new(conn: &'conn Connection) -> StoreResult<Self> {
        let db_version = schema_version(conn)?;
        let expected = latest_version();
        if db_version != expected {
            return Err(DbError::SchemaNotReady {
                db_version,
                expected,
            }
            .into());
        }
        Ok(Self { conn })
    }

    fn immediate(&self) -> StoreResult<Transaction<'_>> {
        Ok(Transaction::new_unchecked(
            self.conn,
            TransactionBehavior::Immediate,
        )?)
    }
}

impl DocumentStore for SqliteDocumentStore<'_> {
    fn get(&self, collection: &str, id: &str) -> StoreResult<Option<Document>> {
        match load_body(self.conn, collection, id)? {
            Some(fields) => Ok(Some(Document::new(id, fields))),
            None => Ok(None),
        }
    }

    fn query(&self, query: &DocumentQuery) -> StoreResult<Vec<Document>> {
        query.validate()?;
        let position = query.cursor_position()?;

        let mut sql = String::from("SELECT id, body FROM documents WHERE collection = ?");
        let mut bind_values: Vec<SqlValue> = vec![SqlValue::Text(query.collection.clone())];

        let order_expr = query.order_by.as_deref().map(field_expr);
        if let Some(expr) = order_expr.as_deref() {
            sql.push_str(&format!(" AND {expr} IS NOT NULL"));
        }

        match (position, order_expr.as_deref()) {
            (Some((Some(cursor_value), cursor_id)), Some(expr)) => {
                let bound = to_sql_value(cursor_value);
                sql.push_str(&format!(" AND ({expr} > ? OR ({expr} = ? AND id > ?))"));
                bind_values.push(bound.clone());
                bind_values.push(bound);
                bind_values.push(SqlValue::Text(cursor_id.to_string()));
            }
            (Some((_, cursor_id)), _) => {
                sql.push_str(" AND id > ?");
                bind_values.push(SqlValue::Text(cursor_id.to_string()));
            }
            (None, _) => {}
        }

        match order_expr.as_deref() {
            Some(expr) => sql.push_str(&format!(" ORDER BY {expr} ASC, id ASC")),
            None => sql.push_str(" ORDER BY id ASC"),
        }

        if let Some(limit) = query.limit {
            sql.push_str(" LIMIT ?");
            bind_values.push(SqlValue::Integer(i64::from(limit)));
            if query.offset > 0 {
                sql.push_str(" OFFSET ?");
                bind_values.push(SqlValue::Integer(offset_to_sql(query.offset)));
            }
        } else if query.offset > 0 {
            sql.push_str(" LIMIT -1 OFFSET ?");
            bind_values.push(SqlValue::Integer(offset_to_sql(query.offset)));
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut docs = Vec::new();
        while let Some(row) = rows.next()? {
            let id: String = row.get("id")?;
            let body: String = row.get("body")?;
            let fields = parse_body(&id, &body)?;
            docs.push(Document::new(id, fields));
        }
        Ok(docs)
    }

    fn set(
        &self,
        collection: &str,
        id: &str,
        fields: Map<String, Value>,
        mode: SetMode,
    ) -> StoreResult<()> {
        match mode {
            SetMode::Replace => upsert_body(self.conn, collection, id, &fields),
            SetMode::Merge => {
                let tx = self.immediate()?;
                let mut current = load_body(&tx, collection, id)?.unwrap_or_default();
                merge_fields(&mut current, fields);
                upsert_body(&tx, collection, id, &current)?;
                tx.commit()?;
                Ok(())
            }
        }
    }

    fn create(&self, collection: &str, id: &str, fields: Map<String, Value>) -> StoreResult<bool> {
        let changed = self.conn.execute(
            "INSERT INTO documents (collection, id, body)
             VALUES (?1, ?2, ?3)
             ON CONFLICT (collection, id) DO NOTHING;",
            params![collection, id, serialize_body(&fields)?],
        )?;
        Ok(changed == 1)
    }

    fn compare_and_set(
        &self,
        collection: &str,
        id: &str,
        field: &str,
        expected: &Value,
        fields: Map<String, Value>,
    ) -> StoreResult<bool> {
        let tx = self.immediate()?;
        let Some(mut current) = load_body(&tx, collection, id)? else {
            return Ok(false);
        };
        if current.get(field) != Some(expected) {
            return Ok(false);
        }
        merge_fields(&mut current, fields);
        upsert_body(&tx, collection, id, &current)?;
        tx.commit()?;
        Ok(true)
    }

    fn delete(&self, collection: &str, id: &str) -> StoreResult<bool> {
        let changed = self.conn.execute(
            "DELETE FROM documents WHERE collection = ?1 AND id = ?2;",
            params![collection, id],
        )?;
        Ok(changed > 0)
    }

    fn count(&self, collection: &str) -> StoreResult<u64> {
        let total: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM documents WHERE collection = ?1;",
            [collection],
            |row| row.get(0),
        )?;
        u64::try_from(total)
            .map_err(|_| StoreError::InvalidData(format!("negative row count {total}")))
    }
}

fn field_expr(field: &str) -> String {
    format!("json_extract(body, '$.{field}')")
}

fn load_body(
    conn: &Connection,
    collection: &str,
    id: &str,
) -> StoreResult<Option<Map<String, Value>>> {
    let body: Option<String> = conn
        .query_row(
            "SELECT body FROM documents WHERE collection = ?1 AND id = ?2;",
            params![collection, id],
            |row| row.get(0),
        )
        .optional()?;
    body.map(|text| parse_body(id, &text)).transpose()
}

fn upsert_body(
    conn: &Connection,
    collection: &str,
    id: &str,
    fields: &Map<String, Value>,
) -> StoreResult<()> {
    conn.execute(
        "INSERT INTO documents (collection, id, body)
         VALUES (?1, ?2, ?3)
         ON CONFLICT (collection, id) DO UPDATE SET
            body = excluded.body,
            updated_at = (strftime('%s', 'now') * 1000);",
        params![collection, id, serialize_body(fields)?],
    )?;
    Ok(())
}

fn serialize_body(fields: &Map<String, Value>) -> StoreResult<String> {
    serde_json::to_string(fields).map_err(|err| StoreError::InvalidData(err.to_string()))
}

fn parse_body(id: &str, body: &str) -> StoreResult<Map<String, Value>> {
    match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(fields)) => Ok(fields),
        Ok(_) => Err(StoreError::InvalidData(format!(
            "documents.body for `{id}` is not a JSON object"
        ))),
        Err(err) => Err(StoreError::InvalidData(format!(
            "documents.body for `{id}` is not valid JSON: {err}"
        ))),
    }
}

/// Binds a cursor value the way `json_extract` would return it.
fn to_sql_value(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Bool(flag) => SqlValue::Integer(i64::from(*flag)),
        Value::Number(number) => match number.as_i64() {
            Some(int) => SqlValue::Integer(int),
            None => SqlValue::Real(number.as_f64().unwrap_or(f64::NAN)),
        },
        Value::String(text) => SqlValue::Text(text.clone()),
        other => SqlValue::Text(other.to_string()),
    }
}

fn offset_to_sql(offset: u64) -> i64 {
    i64::try_from(offset).unwrap_or(i64::MAX)
}
