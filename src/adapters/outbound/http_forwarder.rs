//! HTTP Forwarder
//!
//! Implements UpstreamFetcher with a reqwest client carrying the relay's
//! fixed identity. Redirects are followed only while they stay on the
//! allowlist.

use crate::adapters::outbound::read_response;
use crate::config::Config;
use crate::domain::entities::{RelayRequest, RelayResponse};
use crate::domain::errors::{ConfigError, UpstreamError};
use crate::domain::ports::UpstreamFetcher;
use crate::domain::value_objects::AllowedDomains;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, HOST};
use reqwest::redirect::{Action, Attempt, Policy};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

pub const RELAY_USER_AGENT: &str = concat!(
    "geo-relay/",
    env!("CARGO_PKG_VERSION"),
    " (allowlisted API relay)"
);
pub const RELAY_ACCEPT_LANGUAGE: &str = "ko-KR,ko;q=0.9,en-US;q=0.8,en;q=0.7";
const MAX_REDIRECTS: usize = 10;

pub struct HttpForwarder {
    allowed: Arc<AllowedDomains>,
    timeout: Duration,
    pinned: Vec<(String, SocketAddr)>,
    client: reqwest::Client,
}

impl HttpForwarder {
    pub fn new(allowed: Arc<AllowedDomains>, timeout: Duration) -> Result<Self, ConfigError> {
        let client = build_forward_client(allowed.clone(), timeout, &[])?;
        Ok(Self {
            allowed,
            timeout,
            pinned: Vec::new(),
            client,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        Self::new(
            Arc::new(config.allowed_domains.clone()),
            config.upstream_timeout(),
        )
    }

    /// Resolve `host` to `addr` instead of asking DNS.
    ///
    /// Lets an allowlisted name point at a fixed address, e.g. a local fixture.
    /// The port still comes from the target URL.
    pub fn with_pinned_host(mut self, host: &str, addr: SocketAddr) -> Result<Self, ConfigError> {
        self.pinned.push((host.to_lowercase(), addr));
        self.client = build_forward_client(self.allowed.clone(), self.timeout, &self.pinned)?;
        Ok(self)
    }

    /// The allowlist the redirect policy enforces.
    pub fn allowed_domains(&self) -> Arc<AllowedDomains> {
        self.allowed.clone()
    }
}

#[async_trait]
impl UpstreamFetcher for HttpForwarder {
    async fn fetch(&self, request: RelayRequest) -> Result<RelayResponse, UpstreamError> {
        let mut headers = request.headers;
        headers.remove(HOST);

        let mut builder = self
            .client
            .request(request.method, request.url)
            .headers(headers);
        if let Some(body) = request.body {
            builder = builder.body(body);
        }
        let resp = builder.send().await?;
        read_response(resp).await
    }
}

/// Client with the fixed relay identity and an allowlist-bound redirect policy.
fn build_forward_client(
    allowed: Arc<AllowedDomains>,
    timeout: Duration,
    pinned: &[(String, SocketAddr)],
) -> Result<reqwest::Client, ConfigError> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("*/*"));
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static(RELAY_ACCEPT_LANGUAGE));

    let policy = Policy::custom(move |attempt| redirect_decision(&allowed, attempt));

    let mut builder = reqwest::Client::builder()
        .user_agent(RELAY_USER_AGENT)
        .default_headers(headers)
        .redirect(policy)
        .timeout(timeout);
    for (host, addr) in pinned {
        builder = builder.resolve(host, *addr);
    }
    builder.build().map_err(|e| ConfigError::InvalidValue {
        field: "http client",
        value: e.to_string(),
    })
}

// A hop that leaves the allowlist is handed back to the caller, not followed.
fn redirect_decision(allowed: &AllowedDomains, attempt: Attempt<'_>) -> Action {
    if attempt.previous().len() >= MAX_REDIRECTS {
        return attempt.error("too many redirects");
    }
    let permitted = attempt
        .url()
        .host_str()
        .map(|h| allowed.permits(h))
        .unwrap_or(false);
    if permitted {
        attempt.follow()
    } else {
        tracing::warn!("not following redirect to {}", attempt.url());
        attempt.stop()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relay_identity_constants() {
        assert!(RELAY_USER_AGENT.starts_with("geo-relay/"));
        assert!(RELAY_USER_AGENT.ends_with("(allowlisted API relay)"));
        assert!(RELAY_ACCEPT_LANGUAGE.starts_with("ko-KR"));
    }

    #[test]
    fn test_from_config_shares_allowlist() {
        let config = Config::default();
        let forwarder = HttpForwarder::from_config(&config).unwrap();
        assert!(forwarder.allowed_domains().permits("www.law.go.kr"));
        assert!(!forwarder.allowed_domains().permits("evil.com"));
    }

    #[test]
    fn test_pinned_hosts_accumulate() {
        let addr: SocketAddr = "127.0.0.1:8080".parse().unwrap();
        let forwarder = HttpForwarder::new(
            Arc::new(AllowedDomains::new(["law.go.kr"])),
            Duration::from_secs(1),
        )
        .unwrap()
        .with_pinned_host("LAW.go.kr", addr)
        .unwrap()
        .with_pinned_host("www.law.go.kr", addr)
        .unwrap();
        assert_eq!(
            forwarder.pinned,
            vec![
                ("law.go.kr".to_string(), addr),
                ("www.law.go.kr".to_string(), addr)
            ]
        );
    }
}
