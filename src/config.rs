//! Environment-driven configuration.

use std::env;
use std::time::Duration;

/// Connection settings for the Helix graph store.
#[derive(Debug, Clone)]
pub struct HelixConfig {
    pub host: String,
    pub port: u16,
    /// Per-query timeout.
    pub timeout: Duration,
    pub max_retries: u32,
}

impl Default for HelixConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 6969,
            timeout: Duration::from_millis(5000),
            max_retries: 3,
        }
    }
}

impl HelixConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let host = env::var("HELIX_HOST").unwrap_or(defaults.host);
        let port = env::var("HELIX_PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.port);
        let timeout = env::var("HELIX_TIMEOUT")
            .ok()
            .and_then(|v| v.parse().ok())
            .map(Duration::from_millis)
            .unwrap_or(defaults.timeout);
        let max_retries = env::var("HELIX_MAX_RETRIES")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.max_retries);

        Self {
            host,
            port,
            timeout,
            max_retries,
        }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}
