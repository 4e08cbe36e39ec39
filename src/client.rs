use crate::error::{Result, UploadError};
use chrono::Duration;
use reqwest::blocking::{Client, ClientBuilder};
use url::Url;

/// Create the HTTP client for upload requests
/// with timeouts taken from the configuration
pub fn create_upload_client(config: &Config) -> Result<Client> {
    ClientBuilder::new()
        .pool_max_idle_per_host(10)
        .timeout(config.timeout)
        .connect_timeout(config.connect_timeout)
        .build()
        .map_err(UploadError::Network)
}

/// Configuration for the upload client
#[derive(Debug, Clone)]
pub struct Config {
    /// URL scheme (http or https)
    pub scheme: String,
    /// API host
    pub host: String,
    /// Path of the assembly endpoint
    pub path: String,
    /// Lifetime of a signed policy, added to the current time for `auth.expires`
    pub expires_in: Duration,
    /// Total timeout of a single upload request
    pub timeout: std::time::Duration,
    /// Connection timeout
    pub connect_timeout: std::time::Duration,
    /// Enable debug logging
    pub debug: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            scheme: "https".to_string(),
            host: "api2.transloadit.com".to_string(),
            path: "/assemblies".to_string(),
            expires_in: Duration::seconds(300),
            timeout: std::time::Duration::from_secs(3600), // 1 hour
            connect_timeout: std::time::Duration::from_secs(10),
            debug: false,
        }
    }
}

impl Config {
    /// Create a new configuration with the given scheme and host
    pub fn new(scheme: String, host: String) -> Self {
        Config {
            scheme,
            host,
            ..Config::default()
        }
    }

    /// Set the endpoint path
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    /// Set the policy lifetime
    pub fn with_expires_in(mut self, expires_in: Duration) -> Self {
        self.expires_in = expires_in;
        self
    }

    /// Set the request timeout
    pub fn with_timeout(mut self, timeout: std::time::Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set debug mode
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Get the base URL
    pub fn base_url(&self) -> String {
        format!("{}://{}", self.scheme, self.host)
    }

    /// Get the full upload endpoint
    pub fn endpoint(&self) -> Result<Url> {
        let url = Url::parse(&self.base_url())?.join(&self.path)?;
        Ok(url)
    }
}
