//! Rate-limited warning mechanism for dropped messages.
//!
//! Devices call [`RateLimitedWarner::record_drop`] for every message they
//! discard and [`RateLimitedWarner::warn_if_due`] to emit a summary at most
//! once per interval, so a saturated producer does not flood the log.

use std::{
    sync::atomic::{AtomicU64, Ordering},
    time::{Duration, SystemTime, UNIX_EPOCH},
};

/// Default minimum interval between two warnings from the same warner.
pub const DEFAULT_WARN_INTERVAL: Duration = Duration::from_secs(5);

pub type TimeProvider = Box<dyn Fn() -> u64 + Send + Sync>;

/// Coalesces drop notifications into periodic summaries.
pub struct RateLimitedWarner {
    last_warn: AtomicU64,
    dropped: AtomicU64,
    interval_ms: u64,
    time_provider: TimeProvider,
}

impl RateLimitedWarner {
    /// Create a warner emitting at most one summary per `interval`.
    pub fn new(interval: Duration) -> Self {
        Self::with_time_provider(interval, Box::new(system_time_millis))
    }

    /// Create a warner reading the current time (milliseconds) from `time_provider`.
    pub fn with_time_provider(interval: Duration, time_provider: TimeProvider) -> Self {
        let interval_ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX);
        Self {
            last_warn: AtomicU64::new(time_provider().saturating_sub(interval_ms)),
            dropped: AtomicU64::new(0),
            interval_ms,
            time_provider,
        }
    }

    /// Count one dropped message.
    pub fn record_drop(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// Number of drops not yet reported.
    pub fn pending(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Invoke `log` with the pending drop count if the interval has elapsed.
    pub fn warn_if_due(&self, log: impl FnOnce(u64)) {
        let now = (self.time_provider)();
        let prev = self.last_warn.load(Ordering::Relaxed);
        if now.saturating_sub(prev) < self.interval_ms {
            return;
        }
        if self
            .last_warn
            .compare_exchange(prev, now, Ordering::AcqRel, Ordering::Relaxed)
            .is_err()
        {
            return;
        }
        self.flush(log);
    }

    /// Report any pending drops immediately.
    pub fn flush(&self, log: impl FnOnce(u64)) {
        let count = self.dropped.swap(0, Ordering::Relaxed);
        if count > 0 {
            log(count);
        }
    }
}

impl std::fmt::Debug for RateLimitedWarner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimitedWarner")
            .field("interval_ms", &self.interval_ms)
            .field("pending", &self.pending())
            .finish()
    }
}

fn system_time_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn mock_clock(time: Arc<AtomicU64>) -> TimeProvider {
        Box::new(move || time.load(Ordering::Relaxed))
    }

    #[test]
    fn first_drop_is_reported_immediately() {
        let time = Arc::new(AtomicU64::new(10_000));
        let warner =
            RateLimitedWarner::with_time_provider(Duration::from_secs(5), mock_clock(time));
        warner.record_drop();
        let mut seen = None;
        warner.warn_if_due(|count| seen = Some(count));
        assert_eq!(seen, Some(1));
    }

    #[test]
    fn coalesces_drops_within_interval() {
        let time = Arc::new(AtomicU64::new(10_000));
        let warner = RateLimitedWarner::with_time_provider(
            Duration::from_secs(5),
            mock_clock(Arc::clone(&time)),
        );
        warner.record_drop();
        warner.warn_if_due(|_| {});

        time.store(12_000, Ordering::Relaxed);
        warner.record_drop();
        warner.record_drop();
        let mut seen = None;
        warner.warn_if_due(|count| seen = Some(count));
        assert_eq!(seen, None);
        assert_eq!(warner.pending(), 2);

        time.store(15_000, Ordering::Relaxed);
        warner.record_drop();
        warner.warn_if_due(|count| seen = Some(count));
        assert_eq!(seen, Some(3));
        assert_eq!(warner.pending(), 0);
    }

    #[test]
    fn flush_reports_pending_regardless_of_interval() {
        let warner = RateLimitedWarner::new(Duration::from_secs(3600));
        warner.warn_if_due(|_| {});
        warner.record_drop();
        let mut seen = None;
        warner.flush(|count| seen = Some(count));
        assert_eq!(seen, Some(1));
        let mut again = None;
        warner.flush(|count| again = Some(count));
        assert_eq!(again, None);
    }
}
