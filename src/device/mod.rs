//! Log device contract and the simple local devices.
//!
//! Every sink implements [`FemtoDeviceTrait`]: `write` accepts a message and
//! never fails for operational reasons, `close` releases resources and may be
//! called repeatedly. The [`registry`] maps device names to constructors so
//! devices can be created from configuration strings.

mod appending;
mod file;
pub mod registry;

use std::any::Any;

use crate::message::FemtoMessage;

pub use appending::FemtoAppendingDevice;
pub use file::FemtoFileDevice;
pub use registry::{
    DeviceConstructor, DeviceSpec, create_device, create_devices, parse_device_spec,
    register_device,
};

/// Trait implemented by all log devices.
///
/// Implementations must be thread-safe: producers on any thread may call
/// `write` concurrently.
pub trait FemtoDeviceTrait: Send + Sync {
    /// Accept `message` for output. Failures are absorbed by the device.
    fn write(&self, message: FemtoMessage);

    /// Release files, connections and threads. Idempotent.
    fn close(&self);

    /// Push buffered output towards its destination. Returns `true` when
    /// everything buffered was handed off.
    fn flush(&self) -> bool {
        true
    }

    /// Downcast support for callers holding a trait object.
    fn as_any(&self) -> &dyn Any;
}
