use std::collections::HashMap;

use async_trait::async_trait;
use rusqlite::Connection;
use serde_json::{Value as JsonValue, json};

use crate::error::SqlRelayError;
use crate::path::normalize_storage_path;

use super::OperationHandler;
use super::params::{convert_params, values_as_tosql};
use super::query::{build_first_row, build_rows, count_placeholders, returns_rows};

/// Embedded `SQLite` operation handler owning the connection and the
/// SQL-text-keyed prepared-statement registry.
///
/// Mutated only by the dispatcher's drain loop, which serializes every
/// operation; the handler itself never synchronizes.
pub struct SqliteHandler {
    conn: Option<Connection>,
    statements: HashMap<String, u64>,
    next_statement_id: u64,
}

impl SqliteHandler {
    #[must_use]
    pub fn new() -> Self {
        Self {
            conn: None,
            statements: HashMap::new(),
            next_statement_id: 1,
        }
    }

    fn require_connected(&self) -> Result<(), SqlRelayError> {
        if self.conn.is_some() {
            Ok(())
        } else {
            Err(not_connected())
        }
    }

    fn connection(&mut self) -> Result<&mut Connection, SqlRelayError> {
        self.conn.as_mut().ok_or_else(not_connected)
    }

    fn require_registered(&self, sql: &str) -> Result<(), SqlRelayError> {
        if self.statements.contains_key(sql) {
            Ok(())
        } else {
            Err(SqlRelayError::ExecutionError(format!(
                "invalid statement sql: {sql}"
            )))
        }
    }
}

impl Default for SqliteHandler {
    fn default() -> Self {
        Self::new()
    }
}

fn not_connected() -> SqlRelayError {
    SqlRelayError::ConnectionError("not connected to a database".into())
}

#[async_trait]
impl OperationHandler for SqliteHandler {
    async fn connect(&mut self, path: &str) -> Result<JsonValue, SqlRelayError> {
        if self.conn.is_some() {
            return Err(SqlRelayError::ConnectionError(
                "already connected to a database".into(),
            ));
        }
        if !path.starts_with('/') {
            return Err(SqlRelayError::ConnectionError(format!(
                "invalid path: {path} (expected /namespace/name.db)"
            )));
        }
        let location = normalize_storage_path(path);
        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        tracing::debug!(
            namespace = %location.namespace,
            base = %location.base,
            "database opened"
        );
        self.conn = Some(conn);
        Ok(JsonValue::Null)
    }

    async fn disconnect(&mut self) -> Result<JsonValue, SqlRelayError> {
        let conn = self.conn.take().ok_or_else(not_connected)?;
        self.statements.clear();
        conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE)")?;
        conn.close().map_err(|(_, err)| SqlRelayError::SqliteError(err))?;
        Ok(JsonValue::Null)
    }

    async fn execute(
        &mut self,
        sql: &str,
        params: &[JsonValue],
    ) -> Result<JsonValue, SqlRelayError> {
        let conn = self.connection()?;

        let mut rows = Vec::new();
        let mut any_rows = false;
        let mut rows_affected = 0usize;
        let mut offset = 0usize;

        // Positional parameters are distributed across `;`-separated
        // statements by their `?` marker counts.
        for statement in sql.split(';') {
            let statement = statement.trim();
            if statement.is_empty() {
                continue;
            }
            let take = count_placeholders(statement);
            let end = (offset + take).min(params.len());
            let slice = params.get(offset..end).unwrap_or(&[]);
            offset = end;
            let values = convert_params(slice)?;

            if returns_rows(statement) {
                let mut stmt = conn.prepare(statement)?;
                rows.extend(build_rows(&mut stmt, &values)?);
                any_rows = true;
            } else {
                let refs = values_as_tosql(&values);
                rows_affected += conn.execute(statement, &refs[..])?;
            }
        }

        if any_rows {
            Ok(JsonValue::Array(rows))
        } else {
            Ok(json!({ "rows_affected": rows_affected }))
        }
    }

    async fn prepare(&mut self, sql: &str) -> Result<JsonValue, SqlRelayError> {
        self.require_connected()?;
        if let Some(&id) = self.statements.get(sql) {
            return Ok(json!({ "statement": id, "sql": sql }));
        }
        {
            // Validates the SQL and warms the connection's statement cache.
            let conn = self.connection()?;
            conn.prepare_cached(sql)?;
        }
        let id = self.next_statement_id;
        self.next_statement_id += 1;
        self.statements.insert(sql.to_string(), id);
        Ok(json!({ "statement": id, "sql": sql }))
    }

    async fn run(&mut self, sql: &str, params: &[JsonValue]) -> Result<JsonValue, SqlRelayError> {
        self.require_connected()?;
        self.require_registered(sql)?;
        let values = convert_params(params)?;
        let conn = self.connection()?;
        let mut stmt = conn.prepare_cached(sql)?;
        let refs = values_as_tosql(&values);
        // Step once whether or not the statement yields rows; any row is
        // discarded.
        let mut rows = stmt.query(&refs[..])?;
        let _ = rows.next()?;
        Ok(json!(true))
    }

    async fn get(&mut self, sql: &str, params: &[JsonValue]) -> Result<JsonValue, SqlRelayError> {
        self.require_connected()?;
        self.require_registered(sql)?;
        let values = convert_params(params)?;
        let conn = self.connection()?;
        let mut stmt = conn.prepare_cached(sql)?;
        build_first_row(&mut stmt, &values)
    }

    async fn all(&mut self, sql: &str, params: &[JsonValue]) -> Result<JsonValue, SqlRelayError> {
        self.require_connected()?;
        self.require_registered(sql)?;
        let values = convert_params(params)?;
        let conn = self.connection()?;
        let mut stmt = conn.prepare_cached(sql)?;
        Ok(JsonValue::Array(build_rows(&mut stmt, &values)?))
    }

    async fn finalize(&mut self, sql: &str) -> Result<JsonValue, SqlRelayError> {
        self.require_connected()?;
        // The connection's cache keeps the compiled statement until close;
        // registry removal is the contract-level release.
        self.statements.remove(sql);
        Ok(json!(true))
    }
}
