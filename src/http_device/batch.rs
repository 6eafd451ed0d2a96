//! Batch assembly.
//!
//! Messages are pulled greedily from the head of the queue and formatted
//! until the count ceiling or the byte budget is reached. The byte budget
//! keeps one message worth of headroom below the payload ceiling. Encoded
//! entries can still outgrow the message limit (JSON escapes, vendor
//! envelopes), so every entry is also checked against the ceiling itself: an
//! entry that does not fit is returned to the queue for the next batch, and a
//! lone entry that cannot fit is reformatted with a smaller limit.

use crate::{formatter::SharedMessageFormatter, message::FemtoMessage, send_queue::SendQueue};

use super::config::HttpDeviceConfig;

/// Bytes reserved for the enclosing `[` and `]`.
pub(crate) const ARRAY_OVERHEAD: usize = 2;

/// Ceilings applied while assembling one batch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BatchLimits {
    pub max_batch_size: usize,
    pub max_message_bytesize: usize,
    /// Accumulated entry bytes after which no further entry is added.
    pub byte_budget: usize,
    /// Hard ceiling on the serialized payload.
    pub max_batch_bytesize: usize,
}

impl From<&HttpDeviceConfig> for BatchLimits {
    fn from(config: &HttpDeviceConfig) -> Self {
        Self {
            max_batch_size: config.max_batch_size,
            max_message_bytesize: config.max_message_bytesize,
            byte_budget: config.batch_byte_budget(),
            max_batch_bytesize: config.effective_max_batch_bytesize(),
        }
    }
}

/// Formatted entries ready to be serialized as one JSON array.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Batch {
    entries: Vec<String>,
    bytesize: usize,
    truncated: usize,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Encoded JSON entries in queue order.
    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    /// Accounted bytes: each entry plus one delimiter byte.
    pub fn bytesize(&self) -> usize {
        self.bytesize
    }

    /// Number of entries cut to fit the message or payload limits.
    pub fn truncated(&self) -> usize {
        self.truncated
    }

    /// Serialize as a JSON array.
    pub fn payload(&self) -> String {
        let mut payload = String::with_capacity(self.bytesize + ARRAY_OVERHEAD);
        payload.push('[');
        for (i, entry) in self.entries.iter().enumerate() {
            if i > 0 {
                payload.push(',');
            }
            payload.push_str(entry);
        }
        payload.push(']');
        payload
    }

    /// Payload length once `entry` is appended.
    fn payload_len_with(&self, entry: &str) -> usize {
        self.bytesize + entry.len() + ARRAY_OVERHEAD
    }

    fn push(&mut self, entry: String, truncated: bool) {
        self.bytesize += entry.len() + 1;
        self.truncated += usize::from(truncated);
        self.entries.push(entry);
    }
}

/// Drain up to one batch worth of messages from `queue`.
///
/// The first entry is always admitted so a byte budget smaller than a single
/// message cannot stall delivery.
pub fn build_batch(
    queue: &SendQueue,
    formatter: &SharedMessageFormatter,
    limits: BatchLimits,
) -> Batch {
    let mut batch = Batch::default();
    while batch.len() < limits.max_batch_size
        && (batch.is_empty() || batch.bytesize < limits.byte_budget)
    {
        let Some((message, bytesize)) = queue.dequeue_sized() else {
            break;
        };
        let entry = formatter
            .format(&message, limits.max_message_bytesize)
            .to_string();
        if batch.payload_len_with(&entry) <= limits.max_batch_bytesize {
            batch.push(entry, bytesize > limits.max_message_bytesize);
        } else if batch.is_empty() {
            let entry = shrink_to_fit(formatter, &message, limits, entry);
            batch.push(entry, true);
        } else {
            queue.requeue_front(message, bytesize);
            break;
        }
    }
    batch
}

/// Reformat `message` with halving limits until the entry fits alone in a
/// payload. Gives up at a zero limit, where only the formatter's fixed
/// envelope remains.
fn shrink_to_fit(
    formatter: &SharedMessageFormatter,
    message: &FemtoMessage,
    limits: BatchLimits,
    mut entry: String,
) -> String {
    let ceiling = limits.max_batch_bytesize.saturating_sub(ARRAY_OVERHEAD);
    let mut limit = limits.max_message_bytesize;
    while entry.len() > ceiling && limit > 0 {
        limit /= 2;
        entry = formatter.format(message, limit).to_string();
    }
    entry
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::FemtoMessage;
    use rstest::{fixture, rstest};
    use serde_json::Value;

    #[fixture]
    fn formatter() -> SharedMessageFormatter {
        SharedMessageFormatter::default()
    }

    fn limits(size: usize, message: usize, budget: usize) -> BatchLimits {
        BatchLimits {
            max_batch_size: size,
            max_message_bytesize: message,
            byte_budget: budget,
            max_batch_bytesize: usize::MAX,
        }
    }

    fn ceiling_limits(message: usize, ceiling: usize) -> BatchLimits {
        BatchLimits {
            max_batch_size: 100,
            max_message_bytesize: message,
            byte_budget: ceiling - message - ARRAY_OVERHEAD,
            max_batch_bytesize: ceiling,
        }
    }

    fn queue_with(messages: &[&str]) -> SendQueue {
        let queue = SendQueue::new(usize::MAX);
        for msg in messages {
            assert!(queue.enqueue((*msg).into()));
        }
        queue
    }

    #[rstest]
    fn stops_at_count_ceiling(formatter: SharedMessageFormatter) {
        let queue = queue_with(&["a", "b", "c", "d"]);
        let batch = build_batch(&queue, &formatter, limits(3, 64, 10_000));
        assert_eq!(batch.entries(), [r#""a""#, r#""b""#, r#""c""#]);
        assert_eq!(queue.size(), 1);
        assert_eq!(queue.bytesize(), 1);
        assert_eq!(batch.payload(), r#"["a","b","c"]"#);
    }

    #[rstest]
    fn stops_once_byte_budget_is_reached(formatter: SharedMessageFormatter) {
        // Each entry accounts for 10 bytes: 7 characters, 2 quotes, 1 delimiter.
        let queue = queue_with(&["aaaaaaa", "bbbbbbb", "ccccccc", "ddddddd"]);
        let batch = build_batch(&queue, &formatter, limits(100, 64, 20));
        assert_eq!(batch.len(), 2);
        assert_eq!(batch.bytesize(), 20);
        assert_eq!(queue.size(), 2);
    }

    #[rstest]
    fn admits_first_entry_even_with_zero_budget(formatter: SharedMessageFormatter) {
        let queue = queue_with(&["only", "next"]);
        let batch = build_batch(&queue, &formatter, limits(10, 64, 0));
        assert_eq!(batch.len(), 1);
        assert_eq!(queue.size(), 1);
    }

    #[rstest]
    fn truncates_oversized_messages(formatter: SharedMessageFormatter) {
        let queue = SendQueue::new(usize::MAX);
        queue.enqueue(FemtoMessage::text("x".repeat(50)));
        queue.enqueue(FemtoMessage::text("short"));
        let batch = build_batch(&queue, &formatter, limits(10, 16, 10_000));
        assert_eq!(batch.truncated(), 1);
        let parsed: Vec<Value> = serde_json::from_str(&batch.payload()).expect("valid JSON");
        assert_eq!(parsed[0], Value::String("x".repeat(16)));
        assert_eq!(parsed[1], Value::String("short".into()));
        assert_eq!(queue.bytesize(), 0);
    }

    #[rstest]
    fn empty_queue_yields_empty_batch(formatter: SharedMessageFormatter) {
        let queue = SendQueue::new(100);
        let batch = build_batch(&queue, &formatter, limits(10, 16, 100));
        assert!(batch.is_empty());
        assert_eq!(batch.payload(), "[]");
    }

    #[test]
    fn limits_follow_config() {
        let config = HttpDeviceConfig {
            max_batch_size: 4,
            max_message_bytesize: 10,
            ..Default::default()
        };
        let expected = BatchLimits {
            max_batch_bytesize: 40,
            ..limits(4, 10, 28)
        };
        assert_eq!(BatchLimits::from(&config), expected);
    }

    #[rstest]
    fn escaped_entries_never_exceed_payload_ceiling(formatter: SharedMessageFormatter) {
        let queue = queue_with(&["aaaaaaaaa"]);
        assert!(queue.enqueue(FemtoMessage::text("\u{1}".repeat(10))));

        let first = build_batch(&queue, &formatter, ceiling_limits(10, 30));
        assert_eq!(first.len(), 1);
        assert_eq!(first.payload(), r#"["aaaaaaaaa"]"#);
        assert_eq!(queue.size(), 1);
        assert_eq!(queue.bytesize(), 10);

        let second = build_batch(&queue, &formatter, ceiling_limits(10, 30));
        assert_eq!(second.len(), 1);
        assert_eq!(second.truncated(), 1);
        assert!(second.payload().len() <= 30, "payload {}", second.payload());
        let parsed: Vec<Value> = serde_json::from_str(&second.payload()).expect("valid JSON");
        assert_eq!(parsed[0], Value::String("\u{1}".repeat(2)));
        assert!(queue.is_empty());
    }

    #[rstest]
    fn quotes_count_at_encoded_size(formatter: SharedMessageFormatter) {
        // Eight quotes encode to 18 bytes; two entries would need 39.
        let queue = SendQueue::new(usize::MAX);
        for _ in 0..6 {
            assert!(queue.enqueue(FemtoMessage::text("\"".repeat(8))));
        }
        let limits = ceiling_limits(8, 36);
        let mut delivered = 0;
        while !queue.is_empty() {
            let batch = build_batch(&queue, &formatter, limits);
            assert_eq!(batch.len(), 1);
            assert!(batch.payload().len() <= 36, "payload {}", batch.payload());
            assert_eq!(batch.truncated(), 0);
            delivered += batch.len();
        }
        assert_eq!(delivered, 6);
    }
}
