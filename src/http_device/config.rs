//! Configuration consumed by the batching HTTP device.
//!
//! [`HttpDeviceBuilder`](super::HttpDeviceBuilder) validates these values
//! before [`FemtoHttpDevice`](super::FemtoHttpDevice) uses them at runtime;
//! constructing the device directly runs the same validation.

use std::time::Duration;

use crate::error::DeviceBuildError;
use crate::executor::ExecutorKind;
use crate::rate_limited_warner::DEFAULT_WARN_INTERVAL;

/// Endpoint used when none is supplied.
pub const DEFAULT_ENDPOINT: &str = "http://localhost:12775/v1/logs";
/// Default number of seconds between time-triggered sends.
pub const DEFAULT_BATCH_INTERVAL: Duration = Duration::from_secs(60);
/// Default bound on a single batch request.
pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(5);
/// Default bound on establishing a connection.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
/// Default maximum number of messages per batch.
pub const DEFAULT_MAX_BATCH_SIZE: usize = 100;
/// Default per-message truncation ceiling in bytes.
pub const DEFAULT_MAX_MESSAGE_BYTESIZE: usize = 1 << 16;
/// Default overflow ceiling of the send queue in bytes.
pub const DEFAULT_MAX_QUEUE_BYTESIZE: usize = 1 << 27;
/// Default wait for each shutdown phase (graceful, then forced).
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(3);

/// HTTP methods a batch request may use.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum HTTPMethod {
    #[default]
    POST,
    PUT,
}

impl HTTPMethod {
    /// Convert to the string representation used by ureq.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::POST => "POST",
            Self::PUT => "PUT",
        }
    }
}

/// Authentication applied by the default request builder.
#[derive(Clone, Debug, Default)]
pub enum AuthConfig {
    /// No authentication.
    #[default]
    None,
    /// HTTP Basic authentication with username and password.
    Basic { username: String, password: String },
    /// Bearer token authentication.
    Bearer { token: String },
}

/// Options describing how a [`FemtoHttpDevice`](super::FemtoHttpDevice)
/// batches and delivers messages.
#[derive(Clone, Debug)]
pub struct HttpDeviceConfig {
    /// Elapsed time after which a send happens even if the batch is not full.
    pub batch_interval: Duration,
    /// Timeout for a whole batch request.
    pub write_timeout: Duration,
    /// Timeout for establishing connections.
    pub connect_timeout: Duration,
    /// Message count that makes a batch ready.
    pub max_batch_size: usize,
    /// Per-message truncation ceiling.
    pub max_message_bytesize: usize,
    /// Payload ceiling; derived from size and message ceilings when `None`.
    pub max_batch_bytesize: Option<usize>,
    /// Queue ceiling above which writes are dropped.
    pub max_queue_bytesize: usize,
    /// Execution context spawned on `start`.
    pub executor: ExecutorKind,
    /// Wait applied to each phase of `stop`.
    pub shutdown_timeout: Duration,
    /// Drain the queue before the executor shuts down.
    pub flush_on_stop: bool,
    /// Interval between rate-limited drop warnings.
    pub warn_interval: Duration,
    /// Method used by the default request builder.
    pub method: HTTPMethod,
    /// Authentication used by the default request builder.
    pub auth: AuthConfig,
    /// Extra headers added by the default request builder.
    pub headers: Vec<(String, String)>,
}

impl Default for HttpDeviceConfig {
    fn default() -> Self {
        Self {
            batch_interval: DEFAULT_BATCH_INTERVAL,
            write_timeout: DEFAULT_WRITE_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            max_batch_size: DEFAULT_MAX_BATCH_SIZE,
            max_message_bytesize: DEFAULT_MAX_MESSAGE_BYTESIZE,
            max_batch_bytesize: None,
            max_queue_bytesize: DEFAULT_MAX_QUEUE_BYTESIZE,
            executor: ExecutorKind::default(),
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
            flush_on_stop: true,
            warn_interval: DEFAULT_WARN_INTERVAL,
            method: HTTPMethod::default(),
            auth: AuthConfig::default(),
            headers: Vec::new(),
        }
    }
}

impl HttpDeviceConfig {
    /// Payload ceiling in effect, deriving it when not set explicitly.
    pub fn effective_max_batch_bytesize(&self) -> usize {
        self.max_batch_bytesize.unwrap_or_else(|| {
            self.max_batch_size
                .saturating_mul(self.max_message_bytesize)
        })
    }

    /// Byte budget for batch entries once the last-entry reservation and the
    /// array brackets are set aside.
    pub fn batch_byte_budget(&self) -> usize {
        self.effective_max_batch_bytesize()
            .saturating_sub(self.max_message_bytesize)
            .saturating_sub(super::batch::ARRAY_OVERHEAD)
    }

    /// Check invariants the device relies on.
    pub fn validate(&self) -> Result<(), DeviceBuildError> {
        ensure_non_zero("max_batch_size", self.max_batch_size)?;
        ensure_non_zero("max_message_bytesize", self.max_message_bytesize)?;
        ensure_non_zero("max_queue_bytesize", self.max_queue_bytesize)?;
        ensure_non_zero_duration("batch_interval", self.batch_interval)?;
        ensure_non_zero_duration("write_timeout", self.write_timeout)?;
        ensure_non_zero_duration("connect_timeout", self.connect_timeout)?;
        if let Some(batch) = self.max_batch_bytesize {
            ensure_non_zero("max_batch_bytesize", batch)?;
            if batch < self.max_message_bytesize {
                return Err(DeviceBuildError::InvalidConfig(format!(
                    "max_batch_bytesize ({batch}) must not be smaller than max_message_bytesize ({})",
                    self.max_message_bytesize
                )));
            }
        }
        Ok(())
    }
}

fn ensure_non_zero(field: &str, value: usize) -> Result<(), DeviceBuildError> {
    if value == 0 {
        return Err(DeviceBuildError::InvalidConfig(format!(
            "{field} must be greater than zero"
        )));
    }
    Ok(())
}

fn ensure_non_zero_duration(field: &str, value: Duration) -> Result<(), DeviceBuildError> {
    if value.is_zero() {
        return Err(DeviceBuildError::InvalidConfig(format!(
            "{field} must be greater than zero"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn derives_batch_bytesize_from_size_and_message_limits() {
        let config = HttpDeviceConfig {
            max_batch_size: 10,
            max_message_bytesize: 100,
            ..Default::default()
        };
        assert_eq!(config.effective_max_batch_bytesize(), 1000);
        assert_eq!(config.batch_byte_budget(), 898);
    }

    #[test]
    fn explicit_batch_bytesize_wins() {
        let config = HttpDeviceConfig {
            max_batch_bytesize: Some(4096),
            ..Default::default()
        };
        assert_eq!(config.effective_max_batch_bytesize(), 4096);
    }

    #[rstest]
    #[case(HttpDeviceConfig { max_batch_size: 0, ..Default::default() }, "max_batch_size")]
    #[case(HttpDeviceConfig { max_message_bytesize: 0, ..Default::default() }, "max_message_bytesize")]
    #[case(HttpDeviceConfig { max_queue_bytesize: 0, ..Default::default() }, "max_queue_bytesize")]
    #[case(HttpDeviceConfig { write_timeout: Duration::ZERO, ..Default::default() }, "write_timeout")]
    #[case(HttpDeviceConfig { batch_interval: Duration::ZERO, ..Default::default() }, "batch_interval")]
    #[case(
        HttpDeviceConfig { max_batch_bytesize: Some(10), max_message_bytesize: 20, ..Default::default() },
        "max_batch_bytesize"
    )]
    fn rejects_invalid_values(#[case] config: HttpDeviceConfig, #[case] field: &str) {
        let err = config.validate().expect_err("config should be rejected");
        assert!(err.to_string().contains(field), "unexpected error: {err}");
    }

    #[test]
    fn defaults_are_valid() {
        HttpDeviceConfig::default()
            .validate()
            .expect("defaults should validate");
    }
}
