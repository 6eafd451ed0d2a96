//! Asynchronous batching log devices.
//!
//! A log device is the final sink of a logging pipeline. This crate provides
//! [`FemtoHttpDevice`], which buffers messages in a byte-bounded queue and
//! ships them as JSON array batches over HTTP from a background executor,
//! and [`FemtoDatadogDevice`], its specialisation for the Datadog intake.
//! Simple local devices and a name-based registry round out the set.

pub mod datadog;
pub mod device;
mod error;
pub mod executor;
pub mod formatter;
pub mod http_device;
mod message;
pub mod rate_limited_warner;
mod send_queue;

#[cfg(test)]
mod test_utils;

pub use datadog::{DatadogDeviceBuilder, FemtoDatadogDevice};
pub use device::{
    DeviceConstructor, DeviceSpec, FemtoAppendingDevice, FemtoDeviceTrait, FemtoFileDevice,
    create_device, create_devices, parse_device_spec, register_device,
};
pub use error::{DeviceBuildError, SendError};
pub use executor::{ExecutorKind, ImmediateExecutor, TaskExecutor, ThreadExecutor};
pub use formatter::{DefaultMessageFormatter, MessageFormatter, SharedMessageFormatter};
pub use http_device::{
    AuthConfig, BatchRequest, BatchTransport, DeviceState, Endpoint, FemtoHttpDevice,
    HTTPMethod, HttpDeviceBuilder, HttpDeviceConfig, RequestBuilder, StatsSnapshot,
};
pub use message::FemtoMessage;
pub use send_queue::SendQueue;
