//! Parsed ingestion endpoint.

use std::fmt;

use url::Url;

use crate::error::DeviceBuildError;

/// Absolute `http`/`https` URL a device delivers batches to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Endpoint {
    url: Url,
}

impl Endpoint {
    /// Parse and validate `endpoint`.
    pub fn parse(endpoint: &str) -> Result<Self, DeviceBuildError> {
        let url = Url::parse(endpoint.trim()).map_err(|source| {
            DeviceBuildError::InvalidEndpoint {
                endpoint: endpoint.to_owned(),
                source,
            }
        })?;
        match url.scheme() {
            "http" | "https" => {}
            other => return Err(DeviceBuildError::UnsupportedScheme(other.to_owned())),
        }
        if url.host_str().is_none_or(str::is_empty) {
            return Err(DeviceBuildError::MissingHost(endpoint.to_owned()));
        }
        Ok(Self { url })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn host(&self) -> &str {
        self.url.host_str().unwrap_or_default()
    }

    /// Explicit port, or the scheme's default.
    pub fn port(&self) -> u16 {
        self.url
            .port_or_known_default()
            .unwrap_or(if self.uses_tls() { 443 } else { 80 })
    }

    pub fn path(&self) -> &str {
        self.url.path()
    }

    /// Whether requests must go through TLS with peer verification.
    pub fn uses_tls(&self) -> bool {
        self.url.scheme() == "https"
    }

    /// Same endpoint with its path replaced by `path`.
    pub fn with_path(&self, path: &str) -> Self {
        let mut url = self.url.clone();
        url.set_path(path);
        Self { url }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.url.as_str())
    }
}
