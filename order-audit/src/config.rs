use audit_client::ClientConfig;
use audit_client::config::DEFAULT_BASE_URL;

/// Runtime configuration
///
/// # Environment variables
///
/// | Variable | Default | Meaning |
/// |----------|---------|---------|
/// | SYSEMP_BASE_URL | http://localhost:3000 | retrieval service address |
/// | SYSEMP_TOKEN | (empty) | bearer token |
/// | SYSEMP_MAX_IN_FLIGHT | 2 | in-flight requests per endpoint |
/// | SYSEMP_TIMEOUT_MS | 30000 | request timeout (ms) |
/// | SYSEMP_MAX_ATTEMPTS | 1 | attempts per identifier |
/// | LOG_LEVEL | info | log level |
/// | LOG_JSON | false | JSON console output |
/// | LOG_DIR | (unset) | daily rolling log files |
///
/// # Example
///
/// ```ignore
/// SYSEMP_TOKEN=secret LOG_LEVEL=debug order-audit ids.txt
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub base_url: String,
    pub token: Option<String>,
    pub max_in_flight: usize,
    pub timeout_ms: u64,
    pub max_attempts: u32,
    pub log_level: String,
    pub log_json: bool,
    pub log_dir: Option<String>,
}

impl Config {
    /// Load configuration from the environment
    ///
    /// Unset or unparseable variables fall back to their defaults
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration from an arbitrary variable lookup
    pub fn from_lookup<F>(var: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| var(name).filter(|v| !v.trim().is_empty());
        Self {
            base_url: non_empty("SYSEMP_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.into()),
            token: non_empty("SYSEMP_TOKEN"),
            max_in_flight: var("SYSEMP_MAX_IN_FLIGHT")
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(2),
            timeout_ms: var("SYSEMP_TIMEOUT_MS")
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(30000),
            max_attempts: var("SYSEMP_MAX_ATTEMPTS")
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(1),
            log_level: non_empty("LOG_LEVEL").unwrap_or_else(|| "info".into()),
            log_json: var("LOG_JSON")
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(false),
            log_dir: non_empty("LOG_DIR"),
        }
    }

    /// Retrieval client settings
    pub fn client_config(&self) -> ClientConfig {
        let config = ClientConfig::new(self.base_url.clone())
            .with_timeout_ms(self.timeout_ms)
            .with_max_in_flight(self.max_in_flight)
            .with_max_attempts(self.max_attempts);
        match &self.token {
            Some(token) => config.with_token(token.clone()),
            None => config,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}
