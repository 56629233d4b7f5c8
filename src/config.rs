//! Runtime configuration - API endpoint, local store and request timeout

use std::time::Duration;

use crate::api::{DEFAULT_API_URL, DEFAULT_TIMEOUT};

pub const DEFAULT_STORE_PATH: &str = "liftlog.db";

#[derive(Debug, Clone)]
pub struct Config {
    pub api_url: String,
    pub store_path: String,
    pub timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            store_path: DEFAULT_STORE_PATH.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl Config {
    pub fn new(api_url: Option<String>, store_path: Option<String>, timeout_secs: Option<u64>) -> Self {
        let defaults = Self::default();
        Self {
            api_url: api_url.unwrap_or(defaults.api_url),
            store_path: store_path.unwrap_or(defaults.store_path),
            timeout: timeout_secs.map(Duration::from_secs).unwrap_or(defaults.timeout),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::new(None, None, None);
        assert_eq!(config.api_url, "http://localhost:5000/api");
        assert_eq!(config.store_path, DEFAULT_STORE_PATH);
        assert_eq!(config.timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_overrides() {
        let config = Config::new(Some("http://10.0.2.2:5000/api".into()), Some("/tmp/x.db".into()), Some(3));
        assert_eq!(config.api_url, "http://10.0.2.2:5000/api");
        assert_eq!(config.store_path, "/tmp/x.db");
        assert_eq!(config.timeout, Duration::from_secs(3));
    }
}
