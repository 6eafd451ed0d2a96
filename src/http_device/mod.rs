//! Batching HTTP log device.
//!
//! [`FemtoHttpDevice`] accepts messages from any thread into a byte-bounded
//! [`SendQueue`](crate::send_queue::SendQueue) and ships them to an HTTP
//! endpoint as JSON arrays. A background executor performs every network call
//! so producers never block on I/O.
//!
//! # Batching
//!
//! A batch is sent when either:
//!
//! - the queue holds at least `max_batch_size` messages, or
//! - `batch_interval` has elapsed since the last send attempt.
//!
//! Each batch respects the count ceiling and a byte budget derived from
//! `max_batch_bytesize`. Messages larger than `max_message_bytesize` are
//! truncated.
//!
//! # Delivery Semantics
//!
//! Delivery is at most once. Any non-2xx status or transport error drops the
//! batch after logging a warning; there is no retry. When the queue is full,
//! new writes are dropped and counted.
//!
//! # Customisation
//!
//! Vendor devices plug in a [`MessageFormatter`](crate::formatter::MessageFormatter)
//! to shape each entry and a [`RequestBuilder`] to shape the request.

mod batch;
mod builder;
mod config;
mod device;
mod endpoint;
mod request;
mod stats;
mod transport;


pub use batch::{Batch, BatchLimits, build_batch};
pub use builder::HttpDeviceBuilder;
pub use config::{
    AuthConfig, DEFAULT_BATCH_INTERVAL, DEFAULT_CONNECT_TIMEOUT, DEFAULT_ENDPOINT,
    DEFAULT_MAX_BATCH_SIZE, DEFAULT_MAX_MESSAGE_BYTESIZE, DEFAULT_MAX_QUEUE_BYTESIZE,
    DEFAULT_SHUTDOWN_TIMEOUT, DEFAULT_WRITE_TIMEOUT, HTTPMethod, HttpDeviceConfig,
};
pub use device::{DeviceState, FemtoHttpDevice};
pub use endpoint::Endpoint;
pub use request::{BatchRequest, DefaultRequestBuilder, RequestBuilder, SharedRequestBuilder};
pub use stats::{DeviceStats, StatsSnapshot};
pub use transport::{BatchTransport, UreqTransport};
