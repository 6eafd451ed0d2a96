//! Builder for [`FemtoHttpDevice`].
//!
//! Exposes the endpoint, batching limits, timeouts, authentication and the
//! two override points (message formatter and request builder). A custom
//! [`BatchTransport`] may be injected, which tests use to capture batches
//! without a network.

use std::{fmt, sync::Arc, time::Duration};

use crate::{
    error::DeviceBuildError,
    executor::ExecutorKind,
    formatter::{MessageFormatter, SharedMessageFormatter},
};

use super::{
    config::{AuthConfig, DEFAULT_ENDPOINT, HTTPMethod, HttpDeviceConfig},
    device::{DeviceParts, FemtoHttpDevice},
    endpoint::Endpoint,
    request::{DefaultRequestBuilder, RequestBuilder, SharedRequestBuilder},
    transport::{BatchTransport, UreqTransport},
};

macro_rules! config_setter {
    ($(#[$meta:meta])* $fn_name:ident, $field:ident, $ty:ty) => {
        $(#[$meta])*
        pub fn $fn_name(mut self, value: $ty) -> Self {
            self.config.$field = value;
            self
        }
    };
}

/// Name used in log lines emitted by plain HTTP devices.
const DEVICE_NAME: &str = "FemtoHttpDevice";

/// Builder for constructing [`FemtoHttpDevice`] instances.
#[derive(Clone, Default)]
pub struct HttpDeviceBuilder {
    endpoint: Option<String>,
    config: HttpDeviceConfig,
    formatter: Option<SharedMessageFormatter>,
    request_builder: Option<SharedRequestBuilder>,
    transport: Option<Arc<dyn BatchTransport>>,
    name: Option<&'static str>,
}

impl HttpDeviceBuilder {
    /// Create a builder targeting [`DEFAULT_ENDPOINT`] with default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing configuration.
    pub fn from_config(config: HttpDeviceConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Set the URL batches are delivered to.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    config_setter!(
        #[doc = "Elapsed time after which a partial batch is sent."]
        with_batch_interval,
        batch_interval,
        Duration
    );
    config_setter!(
        #[doc = "Bound on a whole batch request."]
        with_write_timeout,
        write_timeout,
        Duration
    );
    config_setter!(
        #[doc = "Bound on establishing a connection."]
        with_connect_timeout,
        connect_timeout,
        Duration
    );
    config_setter!(
        #[doc = "Message count that makes a batch ready."]
        with_max_batch_size,
        max_batch_size,
        usize
    );
    config_setter!(
        #[doc = "Per-message truncation ceiling in bytes."]
        with_max_message_bytesize,
        max_message_bytesize,
        usize
    );
    config_setter!(
        #[doc = "Queue ceiling in bytes; writes beyond it are dropped."]
        with_max_queue_bytesize,
        max_queue_bytesize,
        usize
    );
    config_setter!(
        #[doc = "Execution context spawned when the device starts."]
        with_executor,
        executor,
        ExecutorKind
    );
    config_setter!(
        #[doc = "Wait applied to each phase of shutdown."]
        with_shutdown_timeout,
        shutdown_timeout,
        Duration
    );
    config_setter!(
        #[doc = "Whether `stop` drains the queue before shutting down."]
        with_flush_on_stop,
        flush_on_stop,
        bool
    );
    config_setter!(
        #[doc = "Minimum interval between drop warnings."]
        with_warn_interval,
        warn_interval,
        Duration
    );
    config_setter!(
        #[doc = "HTTP method used by the default request builder."]
        with_method,
        method,
        HTTPMethod
    );

    /// Payload ceiling in bytes. Derived from the batch and message limits
    /// when unset.
    pub fn with_max_batch_bytesize(mut self, value: usize) -> Self {
        self.config.max_batch_bytesize = Some(value);
        self
    }

    /// Configure HTTP Basic authentication.
    pub fn with_basic_auth(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.config.auth = AuthConfig::Basic {
            username: username.into(),
            password: password.into(),
        };
        self
    }

    /// Configure Bearer token authentication.
    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.config.auth = AuthConfig::Bearer {
            token: token.into(),
        };
        self
    }

    /// Add a single custom HTTP header.
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.headers.push((key.into(), value.into()));
        self
    }

    /// Replace how each message becomes a JSON batch entry.
    pub fn with_formatter<F>(mut self, formatter: F) -> Self
    where
        F: MessageFormatter + 'static,
    {
        self.formatter = Some(SharedMessageFormatter::new(formatter));
        self
    }

    /// Replace how the request for each batch is built. Configured method,
    /// auth and headers only apply to the default builder.
    pub fn with_request_builder<B>(mut self, builder: B) -> Self
    where
        B: RequestBuilder + 'static,
    {
        self.request_builder = Some(SharedRequestBuilder::new(builder));
        self
    }

    /// Deliver batches through `transport` instead of HTTP.
    pub fn with_transport(mut self, transport: Arc<dyn BatchTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub(crate) fn with_name(mut self, name: &'static str) -> Self {
        self.name = Some(name);
        self
    }

    /// Configuration accumulated so far.
    pub fn config(&self) -> &HttpDeviceConfig {
        &self.config
    }

    /// Validate the options and construct the device. Nothing is spawned
    /// until the device starts.
    pub fn build(self) -> Result<FemtoHttpDevice, DeviceBuildError> {
        let endpoint = Endpoint::parse(self.endpoint.as_deref().unwrap_or(DEFAULT_ENDPOINT))?;
        self.config.validate()?;
        let transport = self
            .transport
            .unwrap_or_else(|| Arc::new(UreqTransport::new(&endpoint, &self.config)));
        let request_builder = self.request_builder.unwrap_or_else(|| {
            SharedRequestBuilder::new(DefaultRequestBuilder::from_config(&self.config))
        });
        Ok(FemtoHttpDevice::from_parts(DeviceParts {
            name: self.name.unwrap_or(DEVICE_NAME),
            endpoint,
            formatter: self.formatter.unwrap_or_default(),
            request_builder,
            transport,
            config: self.config,
        }))
    }
}

impl fmt::Debug for HttpDeviceBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpDeviceBuilder")
            .field("endpoint", &self.endpoint)
            .field("config", &self.config)
            .field("custom_formatter", &self.formatter.is_some())
            .field("custom_request_builder", &self.request_builder.is_some())
            .field("custom_transport", &self.transport.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn builds_with_defaults() {
        let device = HttpDeviceBuilder::new().build().expect("defaults are valid");
        assert_eq!(device.endpoint().to_string(), DEFAULT_ENDPOINT);
        assert_eq!(device.config().max_batch_size, 100);
        assert!(!device.is_running());
    }

    #[test]
    fn setters_reach_the_config() {
        let builder = HttpDeviceBuilder::new()
            .with_endpoint("https://logs.example.com/in")
            .with_batch_interval(Duration::from_millis(250))
            .with_max_batch_size(7)
            .with_max_message_bytesize(128)
            .with_max_batch_bytesize(4096)
            .with_max_queue_bytesize(1 << 20)
            .with_executor(ExecutorKind::Immediate)
            .with_flush_on_stop(false)
            .with_method(HTTPMethod::PUT)
            .with_bearer_token("token")
            .with_header("X-Env", "test");
        let config = builder.config();
        assert_eq!(config.batch_interval, Duration::from_millis(250));
        assert_eq!(config.max_batch_size, 7);
        assert_eq!(config.max_message_bytesize, 128);
        assert_eq!(config.max_batch_bytesize, Some(4096));
        assert_eq!(config.max_queue_bytesize, 1 << 20);
        assert_eq!(config.executor, ExecutorKind::Immediate);
        assert!(!config.flush_on_stop);
        assert_eq!(config.method, HTTPMethod::PUT);
        assert!(matches!(&config.auth, AuthConfig::Bearer { token } if token == "token"));
        assert_eq!(config.headers, vec![("X-Env".into(), "test".into())]);
    }

    #[rstest]
    #[case("not a url")]
    #[case("ftp://example.com/logs")]
    #[case("file:///tmp/logs")]
    fn rejects_bad_endpoints(#[case] endpoint: &str) {
        let err = HttpDeviceBuilder::new()
            .with_endpoint(endpoint)
            .build()
            .expect_err("endpoint should be rejected");
        assert!(!matches!(err, DeviceBuildError::InvalidConfig(_)));
    }

    #[test]
    fn rejects_invalid_config() {
        let err = HttpDeviceBuilder::new()
            .with_max_batch_size(0)
            .build()
            .expect_err("zero batch size should be rejected");
        assert!(matches!(err, DeviceBuildError::InvalidConfig(_)));
    }
}
