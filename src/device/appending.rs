//! In-memory device that collects every message it receives.

use std::{any::Any, sync::Arc};

use parking_lot::Mutex;

use crate::message::FemtoMessage;

use super::FemtoDeviceTrait;

/// Shared buffer an [`FemtoAppendingDevice`] appends to.
pub type MessageBuffer = Arc<Mutex<Vec<FemtoMessage>>>;

/// Appends messages to a shared vector. Useful for tests and for capturing
/// output in process.
#[derive(Clone, Debug, Default)]
pub struct FemtoAppendingDevice {
    target: MessageBuffer,
}

impl FemtoAppendingDevice {
    /// Create a device with its own empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a device appending to an existing buffer.
    pub fn with_target(target: MessageBuffer) -> Self {
        Self { target }
    }

    /// Handle to the underlying buffer.
    pub fn target(&self) -> MessageBuffer {
        Arc::clone(&self.target)
    }

    /// Snapshot of the messages written so far.
    pub fn messages(&self) -> Vec<FemtoMessage> {
        self.target.lock().clone()
    }
}

impl FemtoDeviceTrait for FemtoAppendingDevice {
    fn write(&self, message: FemtoMessage) {
        self.target.lock().push(message);
    }

    fn close(&self) {}

    fn as_any(&self) -> &dyn Any {
        self
    }
}
