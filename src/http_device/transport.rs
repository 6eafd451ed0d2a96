//! HTTP transport used to deliver serialized batches.
//!
//! [`UreqTransport`] builds its `ureq::Agent` lazily on the first send so a
//! device that never flushes never opens a connection. HTTPS endpoints get a
//! native-tls connector, which verifies the peer certificate and hostname.

use std::{sync::Arc, time::Duration};

use native_tls::TlsConnector;
use parking_lot::Mutex;
use ureq::{Agent, AgentBuilder};

use crate::error::SendError;

use super::{config::HttpDeviceConfig, endpoint::Endpoint, request::BatchRequest};

/// Delivers one serialized batch per call.
pub trait BatchTransport: Send + Sync {
    /// Send `body` using `request`. Only 2xx responses count as success.
    fn send(&self, request: &BatchRequest, body: &str) -> Result<(), SendError>;

    /// Release pooled connections. Closing an unused transport is a no-op.
    fn close(&self);
}

/// Blocking transport backed by a pooled `ureq::Agent`.
pub struct UreqTransport {
    use_tls: bool,
    connect_timeout: Duration,
    write_timeout: Duration,
    agent: Mutex<Option<Agent>>,
}

impl UreqTransport {
    pub fn new(endpoint: &Endpoint, config: &HttpDeviceConfig) -> Self {
        Self {
            use_tls: endpoint.uses_tls(),
            connect_timeout: config.connect_timeout,
            write_timeout: config.write_timeout,
            agent: Mutex::new(None),
        }
    }

    /// Whether an agent has been constructed.
    pub fn is_connected(&self) -> bool {
        self.agent.lock().is_some()
    }

    fn agent(&self) -> Result<Agent, SendError> {
        let mut slot = self.agent.lock();
        if let Some(agent) = slot.as_ref() {
            return Ok(agent.clone());
        }
        let mut builder = AgentBuilder::new()
            .timeout_connect(self.connect_timeout)
            .timeout(self.write_timeout);
        if self.use_tls {
            let connector = TlsConnector::new().map_err(|err| SendError::Tls(err.to_string()))?;
            builder = builder.tls_connector(Arc::new(connector));
        }
        let agent = builder.build();
        *slot = Some(agent.clone());
        Ok(agent)
    }
}

impl BatchTransport for UreqTransport {
    fn send(&self, request: &BatchRequest, body: &str) -> Result<(), SendError> {
        let agent = self.agent()?;
        let mut req = agent.request(request.method.as_str(), request.endpoint.url().as_str());
        for (name, value) in &request.headers {
            req = req.set(name, value);
        }
        match req.send_string(body) {
            Ok(response) if (200..300).contains(&response.status()) => Ok(()),
            Ok(response) => Err(SendError::Status(response.status())),
            Err(ureq::Error::Status(code, _)) => Err(SendError::Status(code)),
            Err(ureq::Error::Transport(err)) => Err(SendError::Transport(err.to_string())),
        }
    }

    fn close(&self) {
        self.agent.lock().take();
    }
}

impl std::fmt::Debug for UreqTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UreqTransport")
            .field("use_tls", &self.use_tls)
            .field("write_timeout", &self.write_timeout)
            .field("connected", &self.is_connected())
            .finish()
    }
}
