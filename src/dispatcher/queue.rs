use std::collections::VecDeque;
use std::time::Instant;

use crate::protocol::{Priority, RequestEnvelope};

/// A request waiting in one of the dispatcher's tiers.
pub(crate) struct QueuedTask {
    pub envelope: RequestEnvelope,
    pub enqueued_at: Instant,
}

impl QueuedTask {
    /// Whether the task outlived its queue-residency bound.
    pub(crate) fn expired_at(&self, now: Instant) -> bool {
        match self.envelope.ttl_duration() {
            Some(ttl) => now.duration_since(self.enqueued_at) > ttl,
            None => false,
        }
    }
}

/// Three priority tiers with strict precedence and FIFO order within each.
///
/// A task lives in exactly one tier from `push` until `pop_next` removes it.
#[derive(Default)]
pub(crate) struct TierQueues {
    high: VecDeque<QueuedTask>,
    normal: VecDeque<QueuedTask>,
    low: VecDeque<QueuedTask>,
}

impl TierQueues {
    pub(crate) fn push(&mut self, envelope: RequestEnvelope) {
        let tier = envelope.tier();
        let task = QueuedTask {
            envelope,
            enqueued_at: Instant::now(),
        };
        match tier {
            Priority::High => self.high.push_back(task),
            Priority::Normal => self.normal.push_back(task),
            Priority::Low => self.low.push_back(task),
        }
    }

    pub(crate) fn pop_next(&mut self) -> Option<QueuedTask> {
        self.high
            .pop_front()
            .or_else(|| self.normal.pop_front())
            .or_else(|| self.low.pop_front())
    }

    pub(crate) fn len(&self) -> usize {
        self.high.len() + self.normal.len() + self.low.len()
    }

    pub(crate) fn drain_all(&mut self) -> Vec<QueuedTask> {
        let mut stranded = Vec::with_capacity(self.len());
        stranded.extend(self.high.drain(..));
        stranded.extend(self.normal.drain(..));
        stranded.extend(self.low.drain(..));
        stranded
    }
}
