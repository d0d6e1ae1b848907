use std::fmt;
use std::sync::Arc;

use serde_json::{Value as JsonValue, json};
use tokio_util::sync::CancellationToken;

use crate::correlator::{RpcCorrelator, SendOptions};
use crate::error::SqlRelayError;
use crate::protocol::Method;

use super::prepared::RelayPreparedStatement;

/// Typed capability facade over a relay-connected worker.
///
/// Instances can be cloned and shared across tasks; every operation travels
/// as a correlated request and settles exactly once.
#[derive(Clone)]
pub struct RelayClient {
    correlator: RpcCorrelator,
    shutdown: CancellationToken,
}

impl RelayClient {
    pub(crate) fn new(correlator: RpcCorrelator, shutdown: CancellationToken) -> Self {
        Self {
            correlator,
            shutdown,
        }
    }

    /// Open the database behind a slash-separated storage path.
    ///
    /// # Errors
    /// Returns [`SqlRelayError`] if the worker is already connected, the path
    /// is invalid, or the request fails in transit.
    pub async fn connect(&self, path: &str) -> Result<(), SqlRelayError> {
        self.correlator
            .send(Method::Connect, vec![json!(path)])
            .await
            .map(|_| ())
    }

    /// Close the worker's database connection and release cached statements.
    ///
    /// # Errors
    /// Returns [`SqlRelayError`] if the worker is not connected or the
    /// request fails in transit.
    pub async fn disconnect(&self) -> Result<(), SqlRelayError> {
        self.correlator
            .send(Method::Disconnect, vec![])
            .await
            .map(|_| ())
    }

    /// Run one or more SQL statements with positional parameters.
    ///
    /// # Errors
    /// Returns [`SqlRelayError`] for engine failures, timeouts, or channel
    /// failures.
    pub async fn execute(
        &self,
        sql: &str,
        params: &[JsonValue],
    ) -> Result<JsonValue, SqlRelayError> {
        self.execute_with(sql, params, SendOptions::default()).await
    }

    /// [`execute`](Self::execute) with an explicit priority tier and queue
    /// TTL.
    ///
    /// # Errors
    /// Same contract as [`execute`](Self::execute), plus
    /// [`SqlRelayError::TaskExpired`] when the request outlives its TTL in
    /// the worker's queue.
    pub async fn execute_with(
        &self,
        sql: &str,
        params: &[JsonValue],
        options: SendOptions,
    ) -> Result<JsonValue, SqlRelayError> {
        self.correlator
            .send_with(
                Method::Execute,
                vec![json!(sql), JsonValue::Array(params.to_vec())],
                options,
            )
            .await
    }

    /// Prepare a statement on the worker and return a reusable handle.
    ///
    /// Preparing identical SQL twice yields the same worker-side handle.
    ///
    /// # Errors
    /// Returns [`SqlRelayError`] if the worker fails to prepare the
    /// statement or the request fails in transit.
    pub async fn prepare(&self, sql: &str) -> Result<RelayPreparedStatement, SqlRelayError> {
        let result = self.correlator.send(Method::Prepare, vec![json!(sql)]).await?;
        let statement_id = result
            .get("statement")
            .and_then(JsonValue::as_u64)
            .ok_or_else(|| {
                SqlRelayError::ExecutionError("malformed prepare result".into())
            })?;
        Ok(RelayPreparedStatement::new(
            self.correlator.clone(),
            Arc::new(sql.to_owned()),
            statement_id,
        ))
    }

    /// Access the underlying correlator, e.g. to send with custom options.
    #[must_use]
    pub fn correlator(&self) -> &RpcCorrelator {
        &self.correlator
    }

    /// Graceful shutdown: reject everything outstanding, stop the worker,
    /// and refuse further sends. Idempotent.
    pub fn dispose(&self) {
        self.correlator.dispose();
        self.shutdown.cancel();
    }
}

impl fmt::Debug for RelayClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelayClient")
            .field("outstanding", &self.correlator.outstanding())
            .field("disposed", &self.correlator.is_disposed())
            .finish()
    }
}
