// Worker-side dispatch: converts a bursty, mixed-priority inbound stream
// into a serialized, priority-ordered execution sequence against a handler
// that cannot run two operations concurrently.

mod queue;

use std::time::Instant;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::handler::{OperationHandler, dispatch};
use crate::protocol::{Method, PROTOCOL_VERSION, RequestEnvelope, ResponseEnvelope, WireError};
use crate::transport::EnvelopeSink;

use queue::{QueuedTask, TierQueues};

/// Priority-ordered, single-flight dispatcher in front of an
/// [`OperationHandler`].
///
/// Tasks drain in strict tier precedence (high, normal, low) with FIFO order
/// within a tier. A task already being serviced completes before a newly
/// arrived higher-priority task is considered; there is no preemption.
pub struct PriorityDispatcher<H: OperationHandler> {
    handler: H,
    queues: TierQueues,
    responses: Box<dyn EnvelopeSink<ResponseEnvelope>>,
    shutdown: CancellationToken,
}

impl<H: OperationHandler> PriorityDispatcher<H> {
    #[must_use]
    pub fn new(
        handler: H,
        responses: impl EnvelopeSink<ResponseEnvelope> + 'static,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            handler,
            queues: TierQueues::default(),
            responses: Box::new(responses),
            shutdown,
        }
    }

    /// Enqueue a request: normalize its priority tier and stamp the moment it
    /// entered the queue, from which any `ttl` is measured.
    pub fn submit(&mut self, envelope: RequestEnvelope) {
        self.queues.push(envelope);
    }

    /// Number of tasks currently queued across all tiers.
    #[must_use]
    pub fn queued(&self) -> usize {
        self.queues.len()
    }

    /// Service queued tasks until every tier is empty.
    ///
    /// Exactly one drain runs at a time by construction: the dispatcher is
    /// `&mut self` here and owned by a single loop in [`run`](Self::run).
    pub async fn drain(&mut self) {
        while let Some(task) = self.queues.pop_next() {
            self.service(task).await;
        }
    }

    /// Drive the dispatcher from an inbound channel until the channel closes
    /// or `shutdown` fires, then reject whatever is still queued so no task
    /// is left permanently unanswered.
    pub async fn run(mut self, mut inbound: mpsc::UnboundedReceiver<RequestEnvelope>) {
        let shutdown = self.shutdown.clone();
        loop {
            tokio::select! {
                biased;
                () = shutdown.cancelled() => break,
                next = inbound.recv() => {
                    let Some(envelope) = next else { break };
                    self.submit(envelope);
                    self.absorb(&mut inbound);
                    // One task at a time; arrivals between tasks re-enter
                    // tier selection, arrivals mid-task wait their turn.
                    while let Some(task) = self.queues.pop_next() {
                        self.service(task).await;
                        self.absorb(&mut inbound);
                    }
                }
            }
        }
        self.reject_queued("worker channel closed").await;
    }

    fn absorb(&mut self, inbound: &mut mpsc::UnboundedReceiver<RequestEnvelope>) {
        while let Ok(envelope) = inbound.try_recv() {
            self.submit(envelope);
        }
    }

    async fn service(&mut self, task: QueuedTask) {
        let id = task.envelope.id.clone();

        if task.expired_at(Instant::now()) {
            tracing::debug!(id = %id, "task expired in queue; handler skipped");
            self.respond(ResponseEnvelope::failure(Some(id), WireError::task_expired()))
                .await;
            return;
        }

        if task.envelope.version != PROTOCOL_VERSION {
            let detail = format!("unsupported protocol version: {}", task.envelope.version);
            self.respond(ResponseEnvelope::failure(Some(id), WireError::invalid_request(detail)))
                .await;
            return;
        }

        let Some(method) = Method::parse(&task.envelope.method) else {
            tracing::debug!(id = %id, method = %task.envelope.method, "unknown method");
            self.respond(ResponseEnvelope::failure(
                Some(id),
                WireError::method_not_found(&task.envelope.method),
            ))
            .await;
            return;
        };

        let response = match dispatch(&mut self.handler, method, &task.envelope.params).await {
            Ok(result) => ResponseEnvelope::success(id, result),
            Err(err) => ResponseEnvelope::failure(Some(id), err.to_wire()),
        };
        self.respond(response).await;
    }

    async fn respond(&self, response: ResponseEnvelope) {
        if self.responses.deliver(response).await.is_err() {
            tracing::warn!("response channel closed; reply dropped");
        }
    }

    async fn reject_queued(&mut self, reason: &str) {
        let stranded = self.queues.drain_all();
        if stranded.is_empty() {
            return;
        }
        tracing::warn!(count = stranded.len(), reason, "rejecting queued tasks on teardown");
        for task in stranded {
            self.respond(ResponseEnvelope::failure(
                Some(task.envelope.id),
                WireError::channel_failure(reason),
            ))
            .await;
        }
    }
}
