// In-process wiring: a worker thread running the dispatcher, a correlator
// wired to it over channel transports, and the typed capability facade.

mod client;
mod prepared;

pub use client::RelayClient;
pub use prepared::RelayPreparedStatement;

use std::thread;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::config::RelayOptions;
use crate::correlator::RpcCorrelator;
use crate::dispatcher::PriorityDispatcher;
use crate::error::SqlRelayError;
use crate::handler::OperationHandler;
use crate::protocol::ResponseEnvelope;

/// Spawn a worker for `handler` and return a connected client.
///
/// The dispatcher runs on a dedicated named thread with its own
/// current-thread runtime, so blocking engine work never stalls the caller's
/// executor. When either side of the channel pair goes away, every
/// outstanding request settles with a channel-failure error.
///
/// Must be called within a tokio runtime; the response pump task lives on
/// the caller's executor.
///
/// # Errors
/// Returns [`SqlRelayError::ConnectionError`] if the worker thread cannot be
/// spawned.
pub fn spawn_worker<H>(handler: H, options: RelayOptions) -> Result<RelayClient, SqlRelayError>
where
    H: OperationHandler + 'static,
{
    let (request_tx, request_rx) = mpsc::unbounded_channel();
    let (response_tx, response_rx) = mpsc::unbounded_channel();

    let shutdown = CancellationToken::new();
    let dispatcher = PriorityDispatcher::new(handler, response_tx, shutdown.clone());

    thread::Builder::new()
        .name("sql-relay-worker".into())
        .spawn(move || {
            let runtime = match tokio::runtime::Builder::new_current_thread().build() {
                Ok(runtime) => runtime,
                Err(err) => {
                    tracing::warn!(error = %err, "failed to build worker runtime");
                    return;
                }
            };
            runtime.block_on(dispatcher.run(request_rx));
        })
        .map_err(|err| {
            SqlRelayError::ConnectionError(format!("failed to spawn relay worker thread: {err}"))
        })?;

    let correlator = RpcCorrelator::new(request_tx, &options);
    spawn_response_pump(correlator.clone(), response_rx);
    Ok(RelayClient::new(correlator, shutdown))
}

/// Feed worker responses into the correlator until disposal or until the
/// worker side drops its sender, which counts as a channel failure.
fn spawn_response_pump(
    correlator: RpcCorrelator,
    mut responses: mpsc::UnboundedReceiver<ResponseEnvelope>,
) {
    let shutdown = correlator.shutdown_token();
    tokio::spawn(async move {
        loop {
            tokio::select! {
                () = shutdown.cancelled() => break,
                next = responses.recv() => {
                    match next {
                        Some(envelope) => {
                            correlator.on_message(envelope);
                        }
                        None => {
                            correlator.on_channel_failure("worker response channel closed");
                            break;
                        }
                    }
                }
            }
        }
    });
}
