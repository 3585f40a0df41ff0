//! Domain Errors
//!
//! Error taxonomy shared by the caller-side router and the relay service.

use std::fmt;

/// Invalid or incomplete proxy configuration. Fatal at startup.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("unknown proxy type '{0}' (expected none, edge-relay, residential or generic-http)")]
    UnknownProxyType(String),
    #[error("proxy type '{proxy_type}' requires {field}")]
    MissingField {
        proxy_type: &'static str,
        field: &'static str,
    },
    #[error("{field} is not a valid URL: {value}")]
    InvalidUrl { field: &'static str, value: String },
    #[error("{field} has an invalid value: {value}")]
    InvalidValue { field: &'static str, value: String },
}

/// The geolocation service could not be reached at all.
#[derive(Debug, Clone, thiserror::Error)]
#[error("geolocation lookup failed: {0}")]
pub struct GeoLookupError(pub String);

/// Classification of an outbound fetch failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpstreamErrorKind {
    /// The outbound timeout elapsed
    Timeout,
    /// DNS, TCP or TLS connection failure (including the proxy hop)
    Connect,
    /// The intermediary answered with a status outside 100-599
    InvalidStatus,
    /// Any other transport failure, e.g. the body could not be read
    Transport,
}

impl UpstreamErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::Connect => "connect",
            Self::InvalidStatus => "invalid_status",
            Self::Transport => "transport",
        }
    }
}

impl fmt::Display for UpstreamErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A target fetch failed. Never retried here.
#[derive(Debug, Clone, thiserror::Error)]
#[error("upstream {kind} error: {message}")]
pub struct UpstreamError {
    pub kind: UpstreamErrorKind,
    pub message: String,
}

impl UpstreamError {
    pub fn new(kind: UpstreamErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn is_timeout(&self) -> bool {
        self.kind == UpstreamErrorKind::Timeout
    }
}

impl From<reqwest::Error> for UpstreamError {
    fn from(err: reqwest::Error) -> Self {
        let kind = if err.is_timeout() {
            UpstreamErrorKind::Timeout
        } else if err.is_connect() {
            UpstreamErrorKind::Connect
        } else {
            UpstreamErrorKind::Transport
        };
        Self::new(kind, err.to_string())
    }
}

/// Rejection or failure of a single relay service request.
///
/// Each variant maps to one HTTP status; the inbound adapter renders the
/// JSON body. Variants carry the context the caller needs to fix the request.
#[derive(Debug, Clone, thiserror::Error)]
pub enum RelayError {
    #[error("Invalid API key")]
    Auth,
    #[error("Missing url parameter")]
    MissingUrl { allowed_domains: Vec<String> },
    #[error("Invalid URL: {url}")]
    InvalidUrl { url: String, reason: String },
    #[error("domain not allowed: {domain}")]
    DomainNotAllowed {
        domain: String,
        allowed_domains: Vec<String>,
    },
    #[error(transparent)]
    Upstream(#[from] UpstreamError),
}
