//! Delivery counters exposed for observability.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Live counters updated by producers and the send task.
#[derive(Debug, Default)]
pub struct DeviceStats {
    accepted: AtomicU64,
    dropped_overflow: AtomicU64,
    dropped_closed: AtomicU64,
    truncated: AtomicU64,
    batches_sent: AtomicU64,
    batches_failed: AtomicU64,
    messages_sent: AtomicU64,
    messages_lost: AtomicU64,
}

/// Point-in-time copy of [`DeviceStats`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    /// Messages accepted into the queue.
    pub accepted: u64,
    /// Messages rejected because the queue was at its byte ceiling.
    pub dropped_overflow: u64,
    /// Messages written after the device was closed.
    pub dropped_closed: u64,
    /// Messages cut to the per-message or payload byte limit.
    pub truncated: u64,
    /// Batches the endpoint acknowledged with a 2xx status.
    pub batches_sent: u64,
    /// Batches lost to a transport error or non-2xx status.
    pub batches_failed: u64,
    /// Messages contained in acknowledged batches.
    pub messages_sent: u64,
    /// Messages contained in failed batches.
    pub messages_lost: u64,
}

impl DeviceStats {
    pub(crate) fn record_accepted(&self) {
        self.accepted.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_overflow(&self) {
        self.dropped_overflow.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_closed_drop(&self) {
        self.dropped_closed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_batch(&self, messages: usize, truncated: usize, delivered: bool) {
        let messages = messages as u64;
        self.truncated.fetch_add(truncated as u64, Ordering::Relaxed);
        if delivered {
            self.batches_sent.fetch_add(1, Ordering::Relaxed);
            self.messages_sent.fetch_add(messages, Ordering::Relaxed);
        } else {
            self.batches_failed.fetch_add(1, Ordering::Relaxed);
            self.messages_lost.fetch_add(messages, Ordering::Relaxed);
        }
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            accepted: self.accepted.load(Ordering::Relaxed),
            dropped_overflow: self.dropped_overflow.load(Ordering::Relaxed),
            dropped_closed: self.dropped_closed.load(Ordering::Relaxed),
            truncated: self.truncated.load(Ordering::Relaxed),
            batches_sent: self.batches_sent.load(Ordering::Relaxed),
            batches_failed: self.batches_failed.load(Ordering::Relaxed),
            messages_sent: self.messages_sent.load(Ordering::Relaxed),
            messages_lost: self.messages_lost.load(Ordering::Relaxed),
        }
    }
}
