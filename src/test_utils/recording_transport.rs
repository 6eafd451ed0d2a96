//! Transport that records batches in memory instead of sending them.
//!
//! Device tests inject it through
//! [`HttpDeviceBuilder::with_transport`](crate::http_device::HttpDeviceBuilder::with_transport)
//! so batching behaviour can be asserted without a socket.

use std::{
    collections::VecDeque,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use parking_lot::Mutex;
use serde_json::Value;

use crate::{
    error::SendError,
    http_device::{BatchRequest, BatchTransport},
};

/// One captured delivery attempt.
#[derive(Clone, Debug)]
pub struct RecordedBatch {
    pub request: BatchRequest,
    pub body: String,
}

impl RecordedBatch {
    /// Decode the body as a JSON array of entries.
    pub fn entries(&self) -> Vec<Value> {
        serde_json::from_str(&self.body).expect("batch body is a JSON array")
    }
}

/// Records every batch and answers with scripted results.
#[derive(Default)]
pub struct RecordingTransport {
    batches: Mutex<Vec<RecordedBatch>>,
    failures: Mutex<VecDeque<SendError>>,
    delay: Mutex<Option<Duration>>,
    closes: AtomicUsize,
}

impl RecordingTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Fail the next delivery attempt with `error`.
    pub fn fail_next(&self, error: SendError) {
        self.failures.lock().push_back(error);
    }

    /// Sleep this long inside every send.
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock() = Some(delay);
    }

    pub fn batches(&self) -> Vec<RecordedBatch> {
        self.batches.lock().clone()
    }

    pub fn batch_count(&self) -> usize {
        self.batches.lock().len()
    }

    pub fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

impl BatchTransport for RecordingTransport {
    fn send(&self, request: &BatchRequest, body: &str) -> Result<(), SendError> {
        let delay = *self.delay.lock();
        if let Some(delay) = delay {
            std::thread::sleep(delay);
        }
        self.batches.lock().push(RecordedBatch {
            request: request.clone(),
            body: body.to_owned(),
        });
        match self.failures.lock().pop_front() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn close(&self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
    }
}
