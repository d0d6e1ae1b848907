use async_trait::async_trait;
use serde_json::{Value as JsonValue, json};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use sql_relay::SqlRelayError;
use sql_relay::dispatcher::PriorityDispatcher;
use sql_relay::handler::OperationHandler;
use sql_relay::protocol::{Method, RequestEnvelope, RequestId, ResponseEnvelope, codes};

/// A handler that must never be reached in these tests.
struct UnreachableHandler;

macro_rules! refuse {
    () => {
        Err(SqlRelayError::ExecutionError(
            "handler must not be invoked".into(),
        ))
    };
}

#[async_trait]
impl OperationHandler for UnreachableHandler {
    async fn connect(&mut self, _path: &str) -> Result<JsonValue, SqlRelayError> {
        refuse!()
    }
    async fn disconnect(&mut self) -> Result<JsonValue, SqlRelayError> {
        refuse!()
    }
    async fn execute(
        &mut self,
        _sql: &str,
        _params: &[JsonValue],
    ) -> Result<JsonValue, SqlRelayError> {
        refuse!()
    }
    async fn prepare(&mut self, _sql: &str) -> Result<JsonValue, SqlRelayError> {
        refuse!()
    }
    async fn run(&mut self, _sql: &str, _params: &[JsonValue]) -> Result<JsonValue, SqlRelayError> {
        refuse!()
    }
    async fn get(&mut self, _sql: &str, _params: &[JsonValue]) -> Result<JsonValue, SqlRelayError> {
        refuse!()
    }
    async fn all(&mut self, _sql: &str, _params: &[JsonValue]) -> Result<JsonValue, SqlRelayError> {
        refuse!()
    }
    async fn finalize(&mut self, _sql: &str) -> Result<JsonValue, SqlRelayError> {
        refuse!()
    }
}

fn envelope(id: &str) -> RequestEnvelope {
    RequestEnvelope::new(RequestId::new(id), Method::Execute, vec![json!("SELECT 1")])
}

fn channel_failures(responses: &mut mpsc::UnboundedReceiver<ResponseEnvelope>) -> Vec<String> {
    std::iter::from_fn(|| responses.try_recv().ok())
        .map(|response| {
            let error = response.error.expect("teardown rejection");
            assert_eq!(error.code, codes::CHANNEL_FAILURE);
            response.id.expect("correlated response").as_str().to_string()
        })
        .collect()
}

#[tokio::test]
async fn cancellation_rejects_every_queued_task() {
    let (response_tx, mut responses) = mpsc::unbounded_channel();
    let shutdown = CancellationToken::new();
    let mut dispatcher = PriorityDispatcher::new(UnreachableHandler, response_tx, shutdown.clone());

    dispatcher.submit(envelope("a"));
    dispatcher.submit(envelope("b"));
    dispatcher.submit(envelope("c"));
    assert_eq!(dispatcher.queued(), 3);

    shutdown.cancel();
    let (_inbound_tx, inbound_rx) = mpsc::unbounded_channel();
    dispatcher.run(inbound_rx).await;

    let rejected = channel_failures(&mut responses);
    assert_eq!(rejected.len(), 3);
}

#[tokio::test]
async fn closed_inbound_channel_rejects_every_queued_task() {
    let (response_tx, mut responses) = mpsc::unbounded_channel();
    let mut dispatcher =
        PriorityDispatcher::new(UnreachableHandler, response_tx, CancellationToken::new());

    dispatcher.submit(envelope("a"));
    dispatcher.submit(envelope("b"));

    let (inbound_tx, inbound_rx) = mpsc::unbounded_channel::<RequestEnvelope>();
    drop(inbound_tx);
    dispatcher.run(inbound_rx).await;

    let rejected = channel_failures(&mut responses);
    assert_eq!(rejected.len(), 2);
}
