//! Error types shared by the devices.
//!
//! Only construction can fail visibly. Everything that goes wrong after a
//! device is running is reported through `log` and the device statistics.

use std::io;

use thiserror::Error;

/// Errors that may occur while building a device.
#[derive(Debug, Error)]
pub enum DeviceBuildError {
    /// The endpoint could not be parsed as a URL.
    #[error("invalid endpoint {endpoint:?}: {source}")]
    InvalidEndpoint {
        endpoint: String,
        #[source]
        source: url::ParseError,
    },
    /// The endpoint scheme is neither `http` nor `https`.
    #[error("unsupported endpoint scheme {0:?}; expected http or https")]
    UnsupportedScheme(String),
    /// The endpoint has no host component.
    #[error("endpoint {0:?} has no host")]
    MissingHost(String),
    /// Invalid user supplied configuration.
    #[error("invalid device configuration: {0}")]
    InvalidConfig(String),
    /// No constructor is registered under the requested device name.
    #[error("unknown log device {0:?}")]
    UnknownDevice(String),
    /// Underlying I/O error whilst creating the device.
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Failure of a single batch delivery attempt.
///
/// These never reach producers; the send task logs them and moves on.
#[derive(Debug, Error)]
pub enum SendError {
    /// The endpoint answered with a non-2xx status.
    #[error("endpoint responded with status {0}")]
    Status(u16),
    /// Connection, DNS, timeout or other transport level failure.
    #[error("transport error: {0}")]
    Transport(String),
    /// The TLS connector could not be initialised.
    #[error("TLS setup failed: {0}")]
    Tls(String),
}
