//! Bounded FIFO of pending messages with live byte accounting.
//!
//! Producers call [`SendQueue::enqueue`] from any thread; the device's send
//! task drains the head with [`SendQueue::dequeue`]. Both operations hold a
//! short critical section so the byte counter always equals the sum of the
//! queued message sizes.

use std::collections::VecDeque;

use parking_lot::Mutex;

use crate::message::FemtoMessage;

/// Message stored together with the size it was accounted at.
#[derive(Debug)]
struct QueuedMessage {
    message: FemtoMessage,
    bytesize: usize,
}

#[derive(Debug, Default)]
struct QueueState {
    messages: VecDeque<QueuedMessage>,
    bytesize: usize,
}

/// FIFO buffer rejecting writes that would reach its byte ceiling.
#[derive(Debug)]
pub struct SendQueue {
    state: Mutex<QueueState>,
    max_bytesize: usize,
}

impl SendQueue {
    /// Create an empty queue that holds strictly less than `max_bytesize` bytes.
    pub fn new(max_bytesize: usize) -> Self {
        Self {
            state: Mutex::new(QueueState::default()),
            max_bytesize,
        }
    }

    /// Append `message` unless doing so would push the byte count to the
    /// ceiling. Returns `false` when the message was rejected; the queue is
    /// left untouched in that case.
    pub fn enqueue(&self, message: FemtoMessage) -> bool {
        let bytesize = message.bytesize();
        let mut state = self.state.lock();
        if state.bytesize.saturating_add(bytesize) >= self.max_bytesize {
            return false;
        }
        state.bytesize += bytesize;
        state.messages.push_back(QueuedMessage { message, bytesize });
        true
    }

    /// Pop the oldest message, releasing its accounted bytes.
    pub fn dequeue(&self) -> Option<FemtoMessage> {
        self.dequeue_sized().map(|(message, _)| message)
    }

    /// Pop the oldest message together with its accounted size.
    pub(crate) fn dequeue_sized(&self) -> Option<(FemtoMessage, usize)> {
        let mut state = self.state.lock();
        let QueuedMessage { message, bytesize } = state.messages.pop_front()?;
        state.bytesize -= bytesize;
        Some((message, bytesize))
    }

    /// Return a message taken with [`dequeue_sized`](Self::dequeue_sized) to
    /// the head of the queue. The ceiling is not rechecked.
    pub(crate) fn requeue_front(&self, message: FemtoMessage, bytesize: usize) {
        let mut state = self.state.lock();
        state.bytesize += bytesize;
        state.messages.push_front(QueuedMessage { message, bytesize });
    }

    /// Number of queued messages.
    pub fn size(&self) -> usize {
        self.state.lock().messages.len()
    }

    /// Sum of the byte sizes of queued messages.
    pub fn bytesize(&self) -> usize {
        self.state.lock().bytesize
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().messages.is_empty()
    }

    /// Overflow ceiling this queue was created with.
    pub fn max_bytesize(&self) -> usize {
        self.max_bytesize
    }
}
