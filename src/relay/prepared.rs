use std::fmt;
use std::sync::Arc;

use serde_json::{Value as JsonValue, json};

use crate::correlator::RpcCorrelator;
use crate::error::SqlRelayError;
use crate::protocol::Method;

/// Handle to a statement prepared on the worker, keyed by its SQL text.
///
/// Instances can be cloned and reused across awaited calls; the worker keeps
/// one live handle per distinct SQL text until `finalize` or disconnect.
#[derive(Clone)]
pub struct RelayPreparedStatement {
    correlator: RpcCorrelator,
    sql: Arc<String>,
    statement_id: u64,
}

impl RelayPreparedStatement {
    pub(crate) fn new(correlator: RpcCorrelator, sql: Arc<String>, statement_id: u64) -> Self {
        Self {
            correlator,
            sql,
            statement_id,
        }
    }

    /// Raw SQL text of the prepared statement.
    #[must_use]
    pub fn sql(&self) -> &str {
        self.sql.as_str()
    }

    /// Worker-side handle identity; identical SQL prepares to the same id.
    #[must_use]
    pub fn statement_id(&self) -> u64 {
        self.statement_id
    }

    /// Step the statement once, discarding any row it yields.
    ///
    /// # Errors
    /// Returns [`SqlRelayError`] if the worker fails to execute the
    /// statement or the request fails in transit.
    pub async fn run(&self, params: &[JsonValue]) -> Result<(), SqlRelayError> {
        self.send(Method::Run, params).await.map(|_| ())
    }

    /// Fetch the first row, or `None` when the statement yields none.
    ///
    /// # Errors
    /// Returns [`SqlRelayError`] if the worker fails to execute the
    /// statement or the request fails in transit.
    pub async fn get(&self, params: &[JsonValue]) -> Result<Option<JsonValue>, SqlRelayError> {
        let row = self.send(Method::Get, params).await?;
        Ok(match row {
            JsonValue::Null => None,
            value => Some(value),
        })
    }

    /// Fetch every row as a JSON object keyed by column name.
    ///
    /// # Errors
    /// Returns [`SqlRelayError`] if the worker fails to execute the
    /// statement, the request fails in transit, or the result is not the
    /// expected row array.
    pub async fn all(&self, params: &[JsonValue]) -> Result<Vec<JsonValue>, SqlRelayError> {
        match self.send(Method::All, params).await? {
            JsonValue::Array(rows) => Ok(rows),
            other => Err(SqlRelayError::ExecutionError(format!(
                "expected row array, got: {other}"
            ))),
        }
    }

    /// Release the worker-side handle. The statement can be prepared again
    /// afterwards, producing a fresh handle.
    ///
    /// # Errors
    /// Returns [`SqlRelayError`] if the request fails in transit.
    pub async fn finalize(self) -> Result<(), SqlRelayError> {
        self.correlator
            .send(Method::Finalize, vec![json!(self.sql.as_str())])
            .await
            .map(|_| ())
    }

    async fn send(&self, method: Method, params: &[JsonValue]) -> Result<JsonValue, SqlRelayError> {
        self.correlator
            .send(
                method,
                vec![
                    json!(self.sql.as_str()),
                    JsonValue::Array(params.to_vec()),
                ],
            )
            .await
    }
}

impl fmt::Debug for RelayPreparedStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelayPreparedStatement")
            .field("statement_id", &self.statement_id)
            .field("sql", &self.sql)
            .finish()
    }
}
