use serde_json::Value;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for upload operations
#[derive(Debug, Error)]
pub enum UploadError {
    /// Key or secret was empty at construction
    #[error("invalid credentials: auth key and secret must not be empty")]
    InvalidCredentials,

    /// Payload file could not be opened or read
    #[error("file not found or unreadable: {}", path.display())]
    FileNotFound {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// HTTP client error (DNS, connect, timeout, TLS)
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Transport failure reported by a non-reqwest transport
    #[error("transport error: {0}")]
    Transport(String),

    /// Server answered with a non-2xx status
    #[error("HTTP error {status}")]
    HttpStatus { status: u16, body: Option<Value> },

    /// Server answered 2xx but the body is not JSON
    #[error("malformed response (HTTP {status}): {source}")]
    MalformedResponse {
        status: u16,
        body: String,
        #[source]
        source: serde_json::Error,
    },

    /// Request building error
    #[error("failed to build request: {0}")]
    RequestBuild(String),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL parsing error
    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl UploadError {
    /// Create a new HTTP status error
    pub fn http(status: u16, body: Option<Value>) -> Self {
        UploadError::HttpStatus { status, body }
    }

    /// Get the HTTP status code if the server answered
    pub fn status_code(&self) -> Option<u16> {
        match self {
            UploadError::HttpStatus { status, .. } => Some(*status),
            UploadError::MalformedResponse { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Get the parsed error body returned by the server, if any
    pub fn body(&self) -> Option<&Value> {
        match self {
            UploadError::HttpStatus { body, .. } => body.as_ref(),
            _ => None,
        }
    }

    /// Check if the server rejected the request (4xx)
    pub fn is_client_error(&self) -> bool {
        matches!(self, UploadError::HttpStatus { status, .. } if (400..500).contains(status))
    }
}

/// Result type for upload operations
pub type Result<T> = std::result::Result<T, UploadError>;
