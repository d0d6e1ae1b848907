use std::sync::atomic::{AtomicU32, Ordering};

use uuid::Uuid;

use crate::protocol::RequestId;

/// Correlation token source: an instance-unique random prefix combined with
/// a wrapping monotonic counter.
///
/// `fetch_add` wraps the counter back to zero on overflow; collisions across
/// a full wrap are accepted as negligible because the prefix is unique per
/// correlator instance and only currently-outstanding ids must be distinct.
pub(super) struct IdGenerator {
    prefix: u64,
    next: AtomicU32,
}

impl IdGenerator {
    pub(super) fn new() -> Self {
        let (prefix, _) = Uuid::new_v4().as_u64_pair();
        Self {
            prefix,
            next: AtomicU32::new(0),
        }
    }

    pub(super) fn next_id(&self) -> RequestId {
        let seq = self.next.fetch_add(1, Ordering::Relaxed);
        RequestId::from_parts(self.prefix, seq)
    }
}
