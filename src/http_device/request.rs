//! Batch request construction.
//!
//! [`RequestBuilder`] is the second override point of the engine. The default
//! builder targets the configured endpoint with `Content-Type:
//! application/json` plus configured auth and headers; vendor devices wrap it
//! to add their own headers or change the path.

use std::{fmt, sync::Arc};

use base64::{Engine, engine::general_purpose::STANDARD as BASE64_STANDARD};

use super::{
    config::{AuthConfig, HTTPMethod, HttpDeviceConfig},
    endpoint::Endpoint,
};

/// Request metadata; the transport attaches the JSON body.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BatchRequest {
    pub method: HTTPMethod,
    pub endpoint: Endpoint,
    pub headers: Vec<(String, String)>,
}

impl BatchRequest {
    /// `POST` to `endpoint` carrying the JSON content type.
    pub fn json_post(endpoint: Endpoint) -> Self {
        Self {
            method: HTTPMethod::POST,
            endpoint,
            headers: vec![("Content-Type".into(), "application/json".into())],
        }
    }

    /// Set `name` to `value`, replacing an existing header case-insensitively.
    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self
            .headers
            .iter_mut()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(&name))
        {
            Some(entry) => entry.1 = value,
            None => self.headers.push((name, value)),
        }
    }

    /// Value of header `name`, matched case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Builds the request for each outgoing batch.
pub trait RequestBuilder: Send + Sync {
    fn build(&self, endpoint: &Endpoint) -> BatchRequest;
}

/// JSON `POST` with configured method, auth and headers.
#[derive(Clone, Debug, Default)]
pub struct DefaultRequestBuilder {
    method: HTTPMethod,
    auth: AuthConfig,
    headers: Vec<(String, String)>,
}

impl DefaultRequestBuilder {
    pub fn from_config(config: &HttpDeviceConfig) -> Self {
        Self {
            method: config.method,
            auth: config.auth.clone(),
            headers: config.headers.clone(),
        }
    }

    fn apply_auth(&self, request: &mut BatchRequest) {
        match &self.auth {
            AuthConfig::None => {}
            AuthConfig::Basic { username, password } => {
                let encoded = base64_encode(format!("{username}:{password}").as_bytes());
                request.set_header("Authorization", format!("Basic {encoded}"));
            }
            AuthConfig::Bearer { token } => {
                request.set_header("Authorization", format!("Bearer {token}"));
            }
        }
    }
}

impl RequestBuilder for DefaultRequestBuilder {
    fn build(&self, endpoint: &Endpoint) -> BatchRequest {
        let mut request = BatchRequest::json_post(endpoint.clone());
        request.method = self.method;
        self.apply_auth(&mut request);
        for (name, value) in &self.headers {
            request.set_header(name.as_str(), value.as_str());
        }
        request
    }
}

/// Shared request builder trait object held by a device.
#[derive(Clone)]
pub struct SharedRequestBuilder {
    inner: Arc<dyn RequestBuilder>,
}

impl SharedRequestBuilder {
    pub fn new<B>(builder: B) -> Self
    where
        B: RequestBuilder + 'static,
    {
        Self {
            inner: Arc::new(builder),
        }
    }

    pub fn build(&self, endpoint: &Endpoint) -> BatchRequest {
        self.inner.build(endpoint)
    }
}

impl fmt::Debug for SharedRequestBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SharedRequestBuilder(<dyn RequestBuilder>)")
    }
}

/// Base64-encode a byte slice for Basic auth.
fn base64_encode(input: &[u8]) -> String {
    BASE64_STANDARD.encode(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoint() -> Endpoint {
        Endpoint::parse("http://localhost:9000/ingest").expect("valid endpoint")
    }

    #[test]
    fn default_request_is_json_post_to_endpoint() {
        let request = DefaultRequestBuilder::default().build(&endpoint());
        assert_eq!(request.method, HTTPMethod::POST);
        assert_eq!(request.endpoint.path(), "/ingest");
        assert_eq!(request.header("content-type"), Some("application/json"));
        assert_eq!(request.header("Authorization"), None);
    }

    #[test]
    fn applies_bearer_auth_and_extra_headers() {
        let config = HttpDeviceConfig {
            auth: AuthConfig::Bearer {
                token: "secret".into(),
            },
            headers: vec![("X-Source".into(), "tests".into())],
            ..Default::default()
        };
        let request = DefaultRequestBuilder::from_config(&config).build(&endpoint());
        assert_eq!(request.header("authorization"), Some("Bearer secret"));
        assert_eq!(request.header("x-source"), Some("tests"));
    }

    #[test]
    fn applies_basic_auth() {
        let config = HttpDeviceConfig {
            auth: AuthConfig::Basic {
                username: "user".into(),
                password: "pass".into(),
            },
            ..Default::default()
        };
        let request = DefaultRequestBuilder::from_config(&config).build(&endpoint());
        assert_eq!(request.header("Authorization"), Some("Basic dXNlcjpwYXNz"));
    }

    #[test]
    fn set_header_replaces_case_insensitively() {
        let mut request = BatchRequest::json_post(endpoint());
        request.set_header("content-type", "text/plain");
        assert_eq!(request.headers.len(), 1);
        assert_eq!(request.header("Content-Type"), Some("text/plain"));
    }
}
