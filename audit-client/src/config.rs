//! Client configuration

use std::time::Duration;

/// Default retrieval service address
pub const DEFAULT_BASE_URL: &str = "http://localhost:3000";

/// Retrieval client configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Service base URL (e.g., "http://localhost:3000")
    pub base_url: String,

    /// Bearer token sent with every request
    pub token: Option<String>,

    /// Request timeout in milliseconds
    pub timeout_ms: u64,

    /// In-flight requests per endpoint
    pub max_in_flight: usize,

    /// Attempts per identifier and endpoint (1 = no retry)
    pub max_attempts: u32,

    /// Pause before the second attempt; doubles for each further one
    pub retry_backoff_ms: u64,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            token: None,
            timeout_ms: 30_000,
            max_in_flight: 2,
            max_attempts: 1,
            retry_backoff_ms: 500,
        }
    }

    /// Set the bearer token; blank tokens are ignored
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        let token = token.into();
        self.token = (!token.trim().is_empty()).then_some(token);
        self
    }

    /// Set the request timeout
    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Set the per-endpoint parallelism
    pub fn with_max_in_flight(mut self, max_in_flight: usize) -> Self {
        self.max_in_flight = max_in_flight;
        self
    }

    /// Set the attempts per identifier
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Fan-out limits derived from this configuration
    pub fn limits(&self) -> FetchLimits {
        FetchLimits {
            max_in_flight: self.max_in_flight.max(1),
            max_attempts: self.max_attempts.max(1),
            retry_backoff: Duration::from_millis(self.retry_backoff_ms),
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

/// Fan-out limits for one retrieval run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchLimits {
    pub max_in_flight: usize,
    pub max_attempts: u32,
    pub retry_backoff: Duration,
}

impl Default for FetchLimits {
    fn default() -> Self {
        ClientConfig::default().limits()
    }
}
