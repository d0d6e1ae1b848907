// Caller-side request/response correlation over a channel that only offers
// asynchronous, unordered delivery:
// - id: correlation token generation
// - pending: outstanding-request bookkeeping and the timed-out grace memory

mod id;
mod pending;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use serde_json::Value as JsonValue;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

use crate::config::RelayOptions;
use crate::error::SqlRelayError;
use crate::protocol::{Method, Priority, RequestEnvelope, RequestId, ResponseEnvelope};
use crate::transport::EnvelopeSink;

use id::IdGenerator;
use pending::{PendingEntry, PendingTable};

/// Per-request options for [`RpcCorrelator::send_with`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SendOptions {
    /// Tier the worker-side dispatcher services the request in.
    pub priority: Priority,
    /// Queue-residency bound enforced by the dispatcher, independent of the
    /// correlator's own round-trip timeout.
    pub ttl: Option<Duration>,
}

impl SendOptions {
    #[must_use]
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    #[must_use]
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }
}

/// What [`RpcCorrelator::on_message`] did with an inbound envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiveOutcome {
    /// A pending request settled (resolved or rejected).
    Settled,
    /// Null-id envelope; notifications are never matched.
    Notification,
    /// The request already timed out; the late response was swallowed.
    LateAfterTimeout,
    /// No pending request with this id (never sent, or already settled).
    Unmatched,
}

struct CorrelatorInner {
    ids: IdGenerator,
    outbound: Box<dyn EnvelopeSink<RequestEnvelope>>,
    table: Mutex<PendingTable>,
    request_timeout: Duration,
    shutdown: CancellationToken,
}

impl CorrelatorInner {
    fn lock_table(&self) -> MutexGuard<'_, PendingTable> {
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Gives request/response semantics to a one-way, unordered message channel.
///
/// Arbitrarily many requests may be in flight concurrently; each settles
/// exactly once, through whichever of the matching response, the per-request
/// timeout, or disposal happens first.
#[derive(Clone)]
pub struct RpcCorrelator {
    inner: Arc<CorrelatorInner>,
}

impl RpcCorrelator {
    #[must_use]
    pub fn new(
        outbound: impl EnvelopeSink<RequestEnvelope> + 'static,
        options: &RelayOptions,
    ) -> Self {
        Self {
            inner: Arc::new(CorrelatorInner {
                ids: IdGenerator::new(),
                outbound: Box::new(outbound),
                table: Mutex::new(PendingTable::new(options.grace_window)),
                request_timeout: options.request_timeout,
                shutdown: CancellationToken::new(),
            }),
        }
    }

    /// Send a request and await its settlement.
    ///
    /// # Errors
    /// Rejects with [`SqlRelayError::RequestTimeout`] when no response
    /// arrives within the configured timeout, [`SqlRelayError::ChannelFailure`]
    /// when the channel fails while the request is outstanding,
    /// [`SqlRelayError::Disposed`] when called after disposal, or the error
    /// the worker answered with.
    pub async fn send(
        &self,
        method: Method,
        params: Vec<JsonValue>,
    ) -> Result<JsonValue, SqlRelayError> {
        self.send_with(method, params, SendOptions::default()).await
    }

    /// [`send`](Self::send) with an explicit priority tier and queue TTL.
    ///
    /// # Errors
    /// Same contract as [`send`](Self::send).
    pub async fn send_with(
        &self,
        method: Method,
        params: Vec<JsonValue>,
        options: SendOptions,
    ) -> Result<JsonValue, SqlRelayError> {
        let inner = &self.inner;
        let id = inner.ids.next_id();
        let (respond_to, settled) = oneshot::channel();

        {
            let mut table = inner.lock_table();
            if let Some(reason) = table.disposed_reason() {
                return Err(SqlRelayError::Disposed(reason.to_string()));
            }
            table.insert(
                id.clone(),
                PendingEntry {
                    respond_to,
                    timer: None,
                },
            );
        }

        let timer = tokio::spawn(Self::expire_later(
            Arc::clone(inner),
            id.clone(),
            inner.request_timeout,
        ));
        {
            let mut table = inner.lock_table();
            if !table.attach_timer(&id, timer.abort_handle()) {
                // Disposal raced ahead of us; the entry is already settled.
                timer.abort();
            }
        }

        let mut envelope = RequestEnvelope::new(id, method, params);
        if options.priority != Priority::Normal {
            envelope = envelope.with_priority(options.priority);
        }
        if let Some(ttl) = options.ttl {
            envelope = envelope.with_ttl(ttl);
        }

        if inner.outbound.deliver(envelope).await.is_err() {
            // The transport itself failed, which takes down every
            // outstanding request, including this one.
            self.on_channel_failure("request channel closed");
        }

        match settled.await {
            Ok(settlement) => settlement,
            Err(_) => Err(SqlRelayError::Disposed("correlator dropped".into())),
        }
    }

    /// Feed an inbound response envelope to the correlator.
    ///
    /// Notifications are dropped, late responses for timed-out ids are
    /// swallowed within the grace window, and unknown ids are logged and
    /// ignored; none of these raise.
    pub fn on_message(&self, envelope: ResponseEnvelope) -> ReceiveOutcome {
        let Some(id) = envelope.id else {
            tracing::debug!("notification response dropped");
            return ReceiveOutcome::Notification;
        };

        let mut table = self.inner.lock_table();
        table.purge_expired_grace(Instant::now());

        if let Some(entry) = table.remove(&id) {
            if let Some(timer) = entry.timer {
                timer.abort();
            }
            let settlement = match envelope.error {
                Some(error) => Err(SqlRelayError::from_wire(error)),
                None => Ok(envelope.result.unwrap_or(JsonValue::Null)),
            };
            let _ = entry.respond_to.send(settlement);
            ReceiveOutcome::Settled
        } else if table.recently_timed_out(&id) {
            tracing::debug!(id = %id, "late response after timeout; dropped");
            ReceiveOutcome::LateAfterTimeout
        } else {
            tracing::debug!(id = %id, "response with no pending request; ignored");
            ReceiveOutcome::Unmatched
        }
    }

    /// Dispose because the channel itself failed: every outstanding request
    /// rejects with a channel-failure error carrying `reason`, and further
    /// sends fail immediately.
    pub fn on_channel_failure(&self, reason: &str) {
        self.fail_all(reason);
    }

    /// Caller-initiated disposal for graceful shutdown. Idempotent; a second
    /// call is a no-op.
    pub fn dispose(&self) {
        self.fail_all("relay disposed");
    }

    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.inner.lock_table().disposed_reason().is_some()
    }

    /// Number of requests currently awaiting settlement.
    #[must_use]
    pub fn outstanding(&self) -> usize {
        self.inner.lock_table().len()
    }

    /// Token cancelled on disposal, for wiring that needs to shut down with
    /// the correlator.
    #[must_use]
    pub fn shutdown_token(&self) -> CancellationToken {
        self.inner.shutdown.clone()
    }

    fn fail_all(&self, reason: &str) {
        let drained = {
            let mut table = self.inner.lock_table();
            if !table.mark_disposed(reason) {
                return;
            }
            table.drain_pending()
        };
        if !drained.is_empty() {
            tracing::warn!(
                count = drained.len(),
                reason,
                "rejecting outstanding requests on disposal"
            );
        }
        for (_, entry) in drained {
            if let Some(timer) = entry.timer {
                timer.abort();
            }
            let _ = entry
                .respond_to
                .send(Err(SqlRelayError::ChannelFailure(reason.to_string())));
        }
        self.inner.shutdown.cancel();
    }

    async fn expire_later(inner: Arc<CorrelatorInner>, id: RequestId, after: Duration) {
        tokio::time::sleep(after).await;
        let mut table = inner.lock_table();
        if let Some(entry) = table.remove(&id) {
            table.note_timed_out(id.clone(), Instant::now());
            tracing::debug!(id = %id, "request timed out");
            let _ = entry.respond_to.send(Err(SqlRelayError::RequestTimeout));
        }
    }
}
