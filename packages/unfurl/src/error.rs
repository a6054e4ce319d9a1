//! Typed errors for the unfurl library.
//!
//! Uses `thiserror` for library errors (not `anyhow`) to provide
//! strongly-typed, composable error handling. Nothing in here crosses
//! the dispatch boundary: handler errors are recovered into fallback
//! results before the caller sees them.

use thiserror::Error;

/// Security-related errors, primarily for SSRF protection.
#[derive(Debug, Error)]
pub enum SecurityError {
    /// URL scheme not allowed (e.g., file://, ftp://)
    #[error("disallowed URL scheme: {0}")]
    DisallowedScheme(String),

    /// Host is blocked (e.g., localhost, internal IPs)
    #[error("blocked host: {0}")]
    BlockedHost(String),

    /// IP in blocked CIDR range (e.g., 10.0.0.0/8)
    #[error("blocked IP range: {0}")]
    BlockedCidr(String),

    /// URL has no host
    #[error("URL has no host")]
    NoHost,

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),
}

/// Errors that can occur while fetching upstream content.
///
/// A `FetchError` inside a handler tier is a miss, not a fault: the tier
/// is skipped and the next one runs.
#[derive(Debug, Error)]
pub enum FetchError {
    /// HTTP transport failed (connect, TLS, body read)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Upstream returned a non-success status
    #[error("HTTP status {status} for {url}")]
    Status { status: u16, url: String },

    /// Request exceeded its deadline
    #[error("timeout fetching: {url}")]
    Timeout { url: String },

    /// JSON parsing error
    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// Invalid URL format
    #[error("invalid URL: {url}")]
    InvalidUrl { url: String },
}

/// Errors from the image persistence subsystem.
#[derive(Debug, Error)]
pub enum PersistError {
    /// Fetching or uploading the image failed
    #[error("transfer failed: {0}")]
    Transfer(#[from] FetchError),

    /// The durable store rejected the operation
    #[error("store error: {0}")]
    Store(String),
}

/// Result type alias for fetch operations.
pub type FetchResult<T> = std::result::Result<T, FetchError>;

/// Result type alias for security operations.
pub type SecurityResult<T> = std::result::Result<T, SecurityError>;
