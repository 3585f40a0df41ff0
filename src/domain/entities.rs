//! Domain Entities - Core business objects
//!
//! These are per-request values. Nothing here outlives a single call.

use bytes::Bytes;
use reqwest::header::HeaderMap;
use reqwest::{Method, StatusCode, Url};
use serde::Serialize;

/// Placeholder IP when the lookup service answered without one.
pub const UNKNOWN_IP: &str = "unknown";

/// The caller's apparent network location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeoInfo {
    /// Egress IP as seen by the lookup service
    pub ip: String,
    /// Country code (ISO 3166-1 alpha-2), if the service reported one
    pub country_code: Option<String>,
    /// Whether the country differs from the configured home country
    pub is_foreign: bool,
}

impl GeoInfo {
    /// Build a GeoInfo, deriving `is_foreign` against `home_country`.
    ///
    /// An unknown country counts as foreign.
    pub fn new(ip: impl Into<String>, country_code: Option<String>, home_country: &str) -> Self {
        let country_code = country_code
            .map(|c| c.trim().to_uppercase())
            .filter(|c| !c.is_empty());
        let is_foreign = match &country_code {
            Some(code) => !code.eq_ignore_ascii_case(home_country.trim()),
            None => true,
        };
        Self {
            ip: ip.into(),
            country_code,
            is_foreign,
        }
    }

    pub fn country_or_unknown(&self) -> &str {
        self.country_code.as_deref().unwrap_or("unknown")
    }
}

/// An outbound request on its way to a target API.
#[derive(Debug, Clone)]
pub struct RelayRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
}

impl RelayRequest {
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            body: None,
        }
    }

    pub fn get(url: Url) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }
}

/// What came back from the target, passed to the caller unchanged.
#[derive(Debug, Clone)]
pub struct RelayResponse {
    pub status: StatusCode,
    pub content_type: Option<String>,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl RelayResponse {
    /// Body as text, replacing invalid UTF-8.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}
