//! Datadog log intake device.
//!
//! [`FemtoDatadogDevice`] is the batching HTTP engine configured for the
//! Datadog HTTP intake: tighter batch limits, entries shaped as
//! `{"hostname": ..., "message": ...}` and a `DD-API-KEY` header on every
//! request. All batching, shutdown and delivery behaviour comes from
//! [`FemtoHttpDevice`].

mod hostname;

use std::any::Any;

use delegate::delegate;
use serde_json::{Value, json};

use crate::{
    device::FemtoDeviceTrait,
    error::DeviceBuildError,
    formatter::{MessageFormatter, truncated_text},
    http_device::{
        BatchRequest, DefaultRequestBuilder, DeviceState, Endpoint, FemtoHttpDevice,
        HttpDeviceBuilder, HttpDeviceConfig, RequestBuilder, StatsSnapshot,
    },
    message::FemtoMessage,
};

pub use hostname::{UNKNOWN_HOSTNAME, resolve_hostname};

/// Datadog HTTP intake endpoint.
pub const DATADOG_ENDPOINT: &str = "https://http-intake.logs.datadoghq.com/v1/input/";
/// Maximum number of entries per Datadog batch.
pub const DATADOG_MAX_BATCH_SIZE: usize = 480;
/// Maximum size of a single Datadog log entry in bytes.
pub const DATADOG_MAX_MESSAGE_BYTESIZE: usize = 204_800;
/// Maximum size of a Datadog request payload in bytes.
pub const DATADOG_MAX_BATCH_BYTESIZE: usize = 4_194_304;
/// Header carrying the API key.
pub const API_KEY_HEADER: &str = "DD-API-KEY";

const DEVICE_NAME: &str = "FemtoDatadogDevice";

/// Engine configuration with the Datadog intake limits applied.
pub fn datadog_config() -> HttpDeviceConfig {
    HttpDeviceConfig {
        max_batch_size: DATADOG_MAX_BATCH_SIZE,
        max_message_bytesize: DATADOG_MAX_MESSAGE_BYTESIZE,
        max_batch_bytesize: Some(DATADOG_MAX_BATCH_BYTESIZE),
        ..HttpDeviceConfig::default()
    }
}

/// Formats each message as a Datadog log entry.
#[derive(Clone, Debug)]
pub struct DatadogFormatter {
    hostname: String,
}

impl DatadogFormatter {
    pub fn new(hostname: impl Into<String>) -> Self {
        Self {
            hostname: hostname.into(),
        }
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }
}

impl MessageFormatter for DatadogFormatter {
    fn format(&self, message: &FemtoMessage, max_bytesize: usize) -> Value {
        json!({
            "hostname": self.hostname,
            "message": truncated_text(message, max_bytesize),
        })
    }
}

/// Default request plus the `DD-API-KEY` header.
#[derive(Clone, Debug)]
pub struct DatadogRequestBuilder {
    inner: DefaultRequestBuilder,
    api_key: String,
}

impl DatadogRequestBuilder {
    pub fn new(api_key: impl Into<String>, config: &HttpDeviceConfig) -> Self {
        Self {
            inner: DefaultRequestBuilder::from_config(config),
            api_key: api_key.into(),
        }
    }
}

impl RequestBuilder for DatadogRequestBuilder {
    fn build(&self, endpoint: &Endpoint) -> BatchRequest {
        let mut request = self.inner.build(endpoint);
        request.set_header(API_KEY_HEADER, self.api_key.as_str());
        request
    }
}

/// Builder for [`FemtoDatadogDevice`].
///
/// Starts from [`datadog_config`] and [`DATADOG_ENDPOINT`]. Engine options
/// are adjusted through [`configure`](Self::configure).
#[derive(Debug)]
pub struct DatadogDeviceBuilder {
    api_key: String,
    hostname: Option<String>,
    http: HttpDeviceBuilder,
}

impl DatadogDeviceBuilder {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            hostname: None,
            http: HttpDeviceBuilder::from_config(datadog_config()).with_endpoint(DATADOG_ENDPOINT),
        }
    }

    /// Report `hostname` instead of the detected one.
    pub fn with_hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = Some(hostname.into());
        self
    }

    /// Send to a different intake, for example a regional site.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.http = self.http.with_endpoint(endpoint);
        self
    }

    /// Adjust engine options such as the batch interval or executor.
    pub fn configure(mut self, f: impl FnOnce(HttpDeviceBuilder) -> HttpDeviceBuilder) -> Self {
        self.http = f(self.http);
        self
    }

    pub fn build(self) -> Result<FemtoDatadogDevice, DeviceBuildError> {
        if self.api_key.trim().is_empty() {
            return Err(DeviceBuildError::InvalidConfig(
                "Datadog device requires a non-empty API key".into(),
            ));
        }
        let hostname = self.hostname.unwrap_or_else(resolve_hostname);
        let request_builder = DatadogRequestBuilder::new(self.api_key, self.http.config());
        let inner = self
            .http
            .with_formatter(DatadogFormatter::new(hostname.clone()))
            .with_request_builder(request_builder)
            .with_name(DEVICE_NAME)
            .build()?;
        Ok(FemtoDatadogDevice { inner, hostname })
    }
}

/// Batching device shipping logs to the Datadog HTTP intake.
#[derive(Debug)]
pub struct FemtoDatadogDevice {
    inner: FemtoHttpDevice,
    hostname: String,
}

impl FemtoDatadogDevice {
    /// Device with Datadog defaults authenticated by `api_key`.
    pub fn new(api_key: &str) -> Result<Self, DeviceBuildError> {
        Self::builder(api_key).build()
    }

    pub fn builder(api_key: impl Into<String>) -> DatadogDeviceBuilder {
        DatadogDeviceBuilder::new(api_key)
    }

    /// Hostname attached to every entry.
    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    delegate! {
        to self.inner {
            pub fn start(&self) -> std::io::Result<()>;
            /// Queue `message` for delivery, starting the device if necessary.
            pub fn write(&self, message: impl Into<FemtoMessage>);
            pub fn send(&self);
            pub fn batch_ready(&self) -> bool;
            pub fn flush(&self) -> bool;
            pub fn stop(&self);
            pub fn close(&self);
            pub fn state(&self) -> DeviceState;
            pub fn is_running(&self) -> bool;
            pub fn is_closed(&self) -> bool;
            pub fn queue_size(&self) -> usize;
            pub fn queued_bytesize(&self) -> usize;
            pub fn stats(&self) -> StatsSnapshot;
            pub fn endpoint(&self) -> &Endpoint;
            pub fn config(&self) -> &HttpDeviceConfig;
        }
    }
}

impl FemtoDeviceTrait for FemtoDatadogDevice {
    fn write(&self, message: FemtoMessage) {
        self.inner.write(message);
    }

    fn close(&self) {
        self.inner.close();
    }

    fn flush(&self) -> bool {
        self.inner.flush()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
