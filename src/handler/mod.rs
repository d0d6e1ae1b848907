// Operation handler boundary - the worker-side contract the dispatcher
// drives, plus the embedded SQLite implementation:
// - dispatch: wire method + JSON params onto the trait
// - params: JSON to SQLite parameter conversion
// - query: statement classification and row materialization
// - sqlite: connection-owning handler with the prepared-statement registry

mod dispatch;
mod params;
mod query;
mod sqlite;

pub use dispatch::dispatch;
pub use params::{convert_params, json_to_sqlite_value};
pub use query::{count_placeholders, returns_rows};
pub use sqlite::SqliteHandler;

use async_trait::async_trait;
use serde_json::Value as JsonValue;

use crate::error::SqlRelayError;

/// Contract the dispatcher drives, one operation at a time.
///
/// Every call is awaited to completion before the next task is dequeued, so
/// implementations never see concurrent operations. `connect` fails when a
/// connection is already open; every other operation fails when none is.
#[async_trait]
pub trait OperationHandler: Send {
    /// Open the database behind a slash-separated storage path.
    async fn connect(&mut self, path: &str) -> Result<JsonValue, SqlRelayError>;

    /// Close the connection and release every cached statement handle.
    async fn disconnect(&mut self) -> Result<JsonValue, SqlRelayError>;

    /// Run one or more `;`-separated statements with positional parameters
    /// distributed across them, returning rows or an affected-count summary.
    async fn execute(
        &mut self,
        sql: &str,
        params: &[JsonValue],
    ) -> Result<JsonValue, SqlRelayError>;

    /// Prepare a statement; idempotent for identical SQL text, returning the
    /// existing handle rather than creating a duplicate.
    async fn prepare(&mut self, sql: &str) -> Result<JsonValue, SqlRelayError>;

    /// Step a prepared statement once, discarding any row it yields.
    async fn run(&mut self, sql: &str, params: &[JsonValue]) -> Result<JsonValue, SqlRelayError>;

    /// Fetch the first row of a prepared statement, or null when it yields
    /// none.
    async fn get(&mut self, sql: &str, params: &[JsonValue]) -> Result<JsonValue, SqlRelayError>;

    /// Fetch every row of a prepared statement.
    async fn all(&mut self, sql: &str, params: &[JsonValue]) -> Result<JsonValue, SqlRelayError>;

    /// Drop the cached handle for a prepared statement.
    async fn finalize(&mut self, sql: &str) -> Result<JsonValue, SqlRelayError>;
}
