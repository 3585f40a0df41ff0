//! HTTP Geo Locator
//!
//! Implements GeoLocator by asking an IP-geolocation web service who we are.
//! Understands the common JSON shapes (ipinfo, ip-api, ipapi.co) and plain
//! text "what is my IP" endpoints.

use crate::config::ProxyConfig;
use crate::domain::entities::{GeoInfo, UNKNOWN_IP};
use crate::domain::errors::{ConfigError, GeoLookupError};
use crate::domain::ports::GeoLocator;
use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::Url;
use std::net::IpAddr;
use std::time::Duration;

const IP_FIELDS: &[&str] = &["ip", "query", "ip_address"];
const COUNTRY_FIELDS: &[&str] = &["country_code", "countryCode", "country"];

pub struct HttpGeoLocator {
    client: reqwest::Client,
    lookup_url: Url,
    home_country: String,
}

impl HttpGeoLocator {
    pub fn new(
        lookup_url: Url,
        home_country: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ConfigError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("geo-relay/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ConfigError::InvalidValue {
                field: "http client",
                value: e.to_string(),
            })?;
        Ok(Self {
            client,
            lookup_url,
            home_country: home_country.into(),
        })
    }

    pub fn from_config(config: &ProxyConfig) -> Result<Self, ConfigError> {
        Self::new(
            config.geo_lookup_url.clone(),
            config.home_country.clone(),
            config.timeout,
        )
    }
}

#[async_trait]
impl GeoLocator for HttpGeoLocator {
    async fn locate(&self) -> Result<GeoInfo, GeoLookupError> {
        let resp = self
            .client
            .get(self.lookup_url.clone())
            .header(ACCEPT, "application/json, text/plain;q=0.9")
            .send()
            .await
            .map_err(|e| GeoLookupError(e.to_string()))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| GeoLookupError(e.to_string()))?;

        if !status.is_success() {
            tracing::warn!("geolocation service answered {}, using best-effort parse", status);
        }

        let (ip, country) = parse_lookup_body(&body);
        let geo = GeoInfo::new(
            ip.unwrap_or_else(|| UNKNOWN_IP.to_string()),
            country,
            &self.home_country,
        );

        tracing::debug!(
            "located ip={} country={} foreign={}",
            geo.ip,
            geo.country_or_unknown(),
            geo.is_foreign
        );
        Ok(geo)
    }
}

/// Extract `(ip, country_code)` from a lookup response body.
pub fn parse_lookup_body(body: &str) -> (Option<String>, Option<String>) {
    let trimmed = body.trim();

    if let Ok(serde_json::Value::Object(map)) = serde_json::from_str::<serde_json::Value>(trimmed)
    {
        let ip = IP_FIELDS
            .iter()
            .filter_map(|k| map.get(*k).and_then(|v| v.as_str()))
            .map(|v| v.trim().to_string())
            .find(|v| !v.is_empty());
        let country = COUNTRY_FIELDS
            .iter()
            .filter_map(|k| map.get(*k).and_then(|v| v.as_str()))
            .map(str::trim)
            .find(|v| is_country_code(v))
            .map(|v| v.to_uppercase());
        return (ip, country);
    }

    match trimmed.parse::<IpAddr>() {
        Ok(ip) => (Some(ip.to_string()), None),
        Err(_) => (None, None),
    }
}

fn is_country_code(s: &str) -> bool {
    s.len() == 2 && s.chars().all(|c| c.is_ascii_alphabetic())
}
