//! Server configuration.

use serde::{Deserialize, Serialize};

/// Network and request-handling settings for the HTTP service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address to bind, e.g. `0.0.0.0:8000`.
    pub bind_addr: String,
    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,
    /// Maximum accepted request body size in bytes.
    ///
    /// The limit must cover the base64 expansion of an uploaded tile, which
    /// runs about a third larger than the file itself.
    pub max_request_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8000".to_string(),
            request_timeout_secs: 30,
            max_request_size: 10 * 1024 * 1024,
        }
    }
}

impl ServerConfig {
    /// Config bound to the given address with default limits.
    pub fn new(bind_addr: impl Into<String>) -> Self {
        Self {
            bind_addr: bind_addr.into(),
            ..Self::default()
        }
    }

    /// Set the per-request timeout.
    #[must_use]
    pub fn with_request_timeout_secs(mut self, secs: u64) -> Self {
        self.request_timeout_secs = secs;
        self
    }

    /// Set the maximum request body size.
    #[must_use]
    pub fn with_max_request_size(mut self, bytes: usize) -> Self {
        self.max_request_size = bytes;
        self
    }
}
