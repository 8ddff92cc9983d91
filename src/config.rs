//! Client settings with environment-variable overrides.

use std::env;
use std::time::Duration;

/// Default API endpoint for the identity and model discovery services.
pub const DEFAULT_API_ENDPOINT: &str = "https://api.cloud-inference.ai/api/v1";

const ENV_API_ENDPOINT: &str = "INFERENCE_API_ENDPOINT";
const ENV_HTTP_TIMEOUT_SECS: &str = "INFERENCE_HTTP_TIMEOUT_SECS";

const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// Settings for the inference client.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Base URL of the identity/discovery API.
    pub api_endpoint: String,
    /// Timeout applied to every HTTP request (transport, discovery, URI fetch).
    pub http_timeout: Duration,
}

impl Settings {
    /// Build settings from the environment, falling back to defaults.
    pub fn from_env() -> Self {
        let api_endpoint =
            env::var(ENV_API_ENDPOINT).unwrap_or_else(|_| DEFAULT_API_ENDPOINT.to_string());
        let http_timeout = env::var(ENV_HTTP_TIMEOUT_SECS)
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS));
        Self {
            api_endpoint,
            http_timeout,
        }
    }

    pub fn with_api_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.api_endpoint = endpoint.into();
        self
    }

    pub fn with_http_timeout(mut self, timeout: Duration) -> Self {
        self.http_timeout = timeout;
        self
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::from_env()
    }
}

/// Install a formatted `tracing` subscriber honoring `RUST_LOG`.
///
/// Safe to call more than once; later calls are no-ops.
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("inference_client=info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
