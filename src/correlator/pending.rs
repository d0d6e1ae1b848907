use std::collections::{HashMap, HashSet, VecDeque};
use std::time::{Duration, Instant};

use serde_json::Value as JsonValue;
use tokio::sync::oneshot;
use tokio::task::AbortHandle;

use crate::error::SqlRelayError;
use crate::protocol::RequestId;

pub(super) type Settlement = Result<JsonValue, SqlRelayError>;

pub(super) struct PendingEntry {
    pub respond_to: oneshot::Sender<Settlement>,
    pub timer: Option<AbortHandle>,
}

/// Bookkeeping for outstanding requests plus the short memory of ids that
/// timed out, kept so a late response is recognized and swallowed instead of
/// being misreported as unmatched.
///
/// At most one entry per id; settlement, rejection, and disposal all remove
/// the entry, so the map never holds stale records.
pub(super) struct PendingTable {
    pending: HashMap<RequestId, PendingEntry>,
    grace: Duration,
    timed_out: HashSet<RequestId>,
    timed_out_order: VecDeque<(RequestId, Instant)>,
    disposed: Option<String>,
}

impl PendingTable {
    pub(super) fn new(grace: Duration) -> Self {
        Self {
            pending: HashMap::new(),
            grace,
            timed_out: HashSet::new(),
            timed_out_order: VecDeque::new(),
            disposed: None,
        }
    }

    pub(super) fn disposed_reason(&self) -> Option<&str> {
        self.disposed.as_deref()
    }

    pub(super) fn insert(&mut self, id: RequestId, entry: PendingEntry) {
        self.pending.insert(id, entry);
    }

    pub(super) fn remove(&mut self, id: &RequestId) -> Option<PendingEntry> {
        self.pending.remove(id)
    }

    /// Attach the timeout timer to an entry still pending. Returns `false`
    /// when the entry already settled, in which case the caller must abort
    /// the timer itself.
    pub(super) fn attach_timer(&mut self, id: &RequestId, timer: AbortHandle) -> bool {
        match self.pending.get_mut(id) {
            Some(entry) => {
                entry.timer = Some(timer);
                true
            }
            None => false,
        }
    }

    pub(super) fn note_timed_out(&mut self, id: RequestId, now: Instant) {
        self.timed_out_order.push_back((id.clone(), now + self.grace));
        self.timed_out.insert(id);
    }

    /// Forget timed-out ids whose grace window has elapsed. Entries are
    /// recorded in firing order, so the scan stops at the first live one.
    pub(super) fn purge_expired_grace(&mut self, now: Instant) {
        while let Some((_, forget_at)) = self.timed_out_order.front() {
            if *forget_at > now {
                break;
            }
            if let Some((id, _)) = self.timed_out_order.pop_front() {
                self.timed_out.remove(&id);
            }
        }
    }

    pub(super) fn recently_timed_out(&self, id: &RequestId) -> bool {
        self.timed_out.contains(id)
    }

    /// Mark the table disposed. Returns `false` when already disposed, which
    /// makes repeated disposal a no-op.
    pub(super) fn mark_disposed(&mut self, reason: &str) -> bool {
        if self.disposed.is_some() {
            return false;
        }
        self.disposed = Some(reason.to_string());
        self.timed_out.clear();
        self.timed_out_order.clear();
        true
    }

    pub(super) fn drain_pending(&mut self) -> Vec<(RequestId, PendingEntry)> {
        self.pending.drain().collect()
    }

    pub(super) fn len(&self) -> usize {
        self.pending.len()
    }
}
