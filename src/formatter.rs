//! Per-message formatting applied while a batch is assembled.
//!
//! [`MessageFormatter`] is one of the two override points of the batching
//! engine: it turns a queued [`FemtoMessage`] into the JSON value stored as
//! one entry of the outgoing array. Implementors must be thread-safe
//! (`Send + Sync`) because formatting runs on the device's executor.

use std::{fmt, sync::Arc};

use serde_json::Value;

use crate::message::FemtoMessage;

/// Trait for turning queued messages into batch entries.
pub trait MessageFormatter: Send + Sync {
    /// Format `message`, keeping its text within `max_bytesize` bytes.
    fn format(&self, message: &FemtoMessage, max_bytesize: usize) -> Value;
}

impl<F> MessageFormatter for F
where
    F: Fn(&FemtoMessage, usize) -> Value + Send + Sync,
{
    fn format(&self, message: &FemtoMessage, max_bytesize: usize) -> Value {
        self(message, max_bytesize)
    }
}

/// Stringifies the message and truncates it to the byte limit.
#[derive(Copy, Clone, Debug, Default)]
pub struct DefaultMessageFormatter;

impl MessageFormatter for DefaultMessageFormatter {
    fn format(&self, message: &FemtoMessage, max_bytesize: usize) -> Value {
        Value::String(truncated_text(message, max_bytesize))
    }
}

/// Shared formatter trait object held by a device.
#[derive(Clone)]
pub struct SharedMessageFormatter {
    inner: Arc<dyn MessageFormatter>,
}

impl SharedMessageFormatter {
    /// Wrap an owned formatter implementation.
    pub fn new<F>(formatter: F) -> Self
    where
        F: MessageFormatter + 'static,
    {
        Self {
            inner: Arc::new(formatter),
        }
    }

    pub fn format(&self, message: &FemtoMessage, max_bytesize: usize) -> Value {
        self.inner.format(message, max_bytesize)
    }
}

impl Default for SharedMessageFormatter {
    fn default() -> Self {
        Self::new(DefaultMessageFormatter)
    }
}

impl fmt::Debug for SharedMessageFormatter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SharedMessageFormatter(<dyn MessageFormatter>)")
    }
}

/// Text form of `message` cut to at most `max_bytesize` bytes.
pub fn truncated_text(message: &FemtoMessage, max_bytesize: usize) -> String {
    match message {
        FemtoMessage::Text(text) => truncate_utf8(text, max_bytesize).to_owned(),
        FemtoMessage::Structured(_) => {
            let mut text = message.to_text();
            let keep = truncate_utf8(&text, max_bytesize).len();
            text.truncate(keep);
            text
        }
    }
}

/// Longest prefix of `text` that fits in `max_bytesize` bytes without
/// splitting a character.
pub fn truncate_utf8(text: &str, max_bytesize: usize) -> &str {
    if text.len() <= max_bytesize {
        return text;
    }
    let mut end = max_bytesize;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}
