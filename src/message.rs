//! Message representation accepted by every log device.
//!
//! A [`FemtoMessage`] is either a pre-rendered line of text or a structured
//! key/value record. The byte size used for queue accounting is the UTF-8
//! length of the text, or the length of the compact JSON encoding of the
//! record.

use std::{fmt, io};

use serde_json::{Map, Value};

/// Payload handed to a log device by the facade above it.
#[derive(Clone, Debug, PartialEq)]
pub enum FemtoMessage {
    /// Already formatted text.
    Text(String),
    /// Structured record serialized as a JSON object on the wire.
    Structured(Map<String, Value>),
}

impl FemtoMessage {
    /// Construct a text message.
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    /// Construct a structured message from key/value pairs.
    pub fn structured<I, K, V>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        Self::Structured(
            fields
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Number of bytes this message occupies in the send queue.
    pub fn bytesize(&self) -> usize {
        match self {
            Self::Text(text) => text.len(),
            Self::Structured(fields) => {
                let mut counter = ByteCounter(0);
                // Writing into a counter cannot fail and a string-keyed map
                // always serializes.
                let _ = serde_json::to_writer(&mut counter, fields);
                counter.0
            }
        }
    }

    /// Render the message as text; structured records become compact JSON.
    pub fn to_text(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Structured(fields) => Value::Object(fields.clone()).to_string(),
        }
    }

    /// Returns `true` for structured records.
    pub fn is_structured(&self) -> bool {
        matches!(self, Self::Structured(_))
    }
}

impl fmt::Display for FemtoMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => f.write_str(text),
            Self::Structured(fields) => write!(f, "{}", Value::Object(fields.clone())),
        }
    }
}

impl From<String> for FemtoMessage {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for FemtoMessage {
    fn from(text: &str) -> Self {
        Self::Text(text.to_owned())
    }
}

impl From<Map<String, Value>> for FemtoMessage {
    fn from(fields: Map<String, Value>) -> Self {
        Self::Structured(fields)
    }
}

/// `io::Write` sink that only counts bytes.
struct ByteCounter(usize);

impl io::Write for ByteCounter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0 += buf.len();
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
