//! Relay Client
//!
//! Issues a caller's request either directly or through the configured
//! intermediary. One reqwest client per route, built once and reused.

use crate::config::{redact_url, ProxyBackend, ProxyConfig};
use crate::domain::entities::{RelayRequest, RelayResponse};
use crate::domain::errors::{ConfigError, UpstreamError, UpstreamErrorKind};
use crate::domain::ports::RelayDispatcher;
use crate::domain::value_objects::{ApiKeyPlacement, ProxyType};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE, HOST};
use reqwest::{Client, Proxy, Url};
use std::time::Duration;

/// Header carrying the edge relay's API key.
pub const API_KEY_HEADER: &str = "x-api-key";

pub struct RelayClient {
    backend: ProxyBackend,
    /// Talks to the edge relay, or tunnels through the proxy backend
    via_backend: Client,
    direct: Client,
    timeout: Duration,
}

impl RelayClient {
    /// Build the clients for `config`. Every route shares `config.timeout`.
    pub fn new(config: &ProxyConfig) -> Result<Self, ConfigError> {
        let direct = build_client(config.timeout, None)?;

        let via_backend = match &config.backend {
            ProxyBackend::None | ProxyBackend::EdgeRelay { .. } => direct.clone(),
            ProxyBackend::Residential {
                gateway,
                username,
                password,
            } => {
                let proxy = Proxy::all(gateway.as_str())
                    .map_err(|_| invalid_url("GEORELAY_RESIDENTIAL_GATEWAY", gateway))?
                    .basic_auth(username, password);
                build_client(config.timeout, Some(proxy))?
            }
            ProxyBackend::GenericHttp {
                proxy_url,
                username,
                password,
            } => {
                let mut proxy = Proxy::all(proxy_url.as_str())
                    .map_err(|_| invalid_url("GEORELAY_RELAY_URL", proxy_url))?;
                // Userinfo in the URL is picked up by reqwest; explicit credentials win.
                match (username, password) {
                    (Some(user), password) => {
                        proxy = proxy.basic_auth(user, password.as_deref().unwrap_or_default());
                    }
                    (None, Some(_)) => tracing::warn!(
                        "proxy password given without a username for {}, ignoring it",
                        redact_url(proxy_url)
                    ),
                    (None, None) => {}
                }
                build_client(config.timeout, Some(proxy))?
            }
        };

        Ok(Self {
            backend: config.backend.clone(),
            via_backend,
            direct,
            timeout: config.timeout,
        })
    }

    pub fn proxy_type(&self) -> ProxyType {
        self.backend.proxy_type()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Relay when `must_relay`, otherwise go direct.
    pub async fn dispatch(
        &self,
        request: RelayRequest,
        must_relay: bool,
    ) -> Result<RelayResponse, UpstreamError> {
        if must_relay {
            self.relay(request).await
        } else {
            self.direct(request).await
        }
    }

    /// Send `request` through the configured intermediary.
    pub async fn relay(&self, request: RelayRequest) -> Result<RelayResponse, UpstreamError> {
        match &self.backend {
            ProxyBackend::None => {
                tracing::warn!(
                    "relay requested for {} but no backend is configured, going direct",
                    request.url
                );
                self.direct(request).await
            }
            ProxyBackend::EdgeRelay {
                relay_url,
                api_key,
                key_placement,
            } => {
                let mut headers = request.headers.clone();
                let url = edge_relay_url(relay_url, &request.url, api_key.as_deref(), *key_placement);
                if let (Some(key), ApiKeyPlacement::Header) = (api_key, key_placement) {
                    let value = HeaderValue::from_str(key).map_err(|_| {
                        UpstreamError::new(
                            UpstreamErrorKind::Transport,
                            "relay API key is not a valid header value",
                        )
                    })?;
                    headers.insert(API_KEY_HEADER, value);
                }
                tracing::debug!("edge relay {} via {}", request.url, redact_url(relay_url));
                self.send(&self.via_backend, request.with_headers(headers), url)
                    .await
            }
            ProxyBackend::Residential { gateway, .. } => {
                tracing::debug!("residential tunnel {} via {}", request.url, redact_url(gateway));
                let url = request.url.clone();
                self.send(&self.via_backend, request, url).await
            }
            ProxyBackend::GenericHttp { proxy_url, .. } => {
                tracing::debug!("http proxy {} via {}", request.url, redact_url(proxy_url));
                let url = request.url.clone();
                self.send(&self.via_backend, request, url).await
            }
        }
    }

    /// Send `request` with no intermediary.
    pub async fn direct(&self, request: RelayRequest) -> Result<RelayResponse, UpstreamError> {
        tracing::debug!("direct {}", request.url);
        let url = request.url.clone();
        self.send(&self.direct, request, url).await
    }

    async fn send(
        &self,
        client: &Client,
        request: RelayRequest,
        url: Url,
    ) -> Result<RelayResponse, UpstreamError> {
        let mut headers = request.headers;
        headers.remove(HOST);

        let mut builder = client.request(request.method, url).headers(headers);
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let resp = builder.send().await?;
        read_response(resp).await
    }
}

#[async_trait]
impl RelayDispatcher for RelayClient {
    fn proxy_type(&self) -> ProxyType {
        RelayClient::proxy_type(self)
    }

    async fn relay(&self, request: RelayRequest) -> Result<RelayResponse, UpstreamError> {
        RelayClient::relay(self, request).await
    }

    async fn direct(&self, request: RelayRequest) -> Result<RelayResponse, UpstreamError> {
        RelayClient::direct(self, request).await
    }
}

/// `relay_url` with the target (and optionally the key) as query parameters.
pub fn edge_relay_url(
    relay_url: &Url,
    target: &Url,
    api_key: Option<&str>,
    key_placement: ApiKeyPlacement,
) -> Url {
    let mut url = relay_url.clone();
    {
        let mut pairs = url.query_pairs_mut();
        pairs.append_pair("url", target.as_str());
        if let (Some(key), ApiKeyPlacement::Query) = (api_key, key_placement) {
            pairs.append_pair("api_key", key);
        }
    }
    url
}

/// Collect a response, rejecting statuses outside 100-599.
pub async fn read_response(resp: reqwest::Response) -> Result<RelayResponse, UpstreamError> {
    let status = resp.status();
    if !(100..=599).contains(&status.as_u16()) {
        return Err(UpstreamError::new(
            UpstreamErrorKind::InvalidStatus,
            format!("unexpected status {}", status.as_u16()),
        ));
    }

    let headers: HeaderMap = resp.headers().clone();
    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(String::from);
    let body = resp.bytes().await?;

    Ok(RelayResponse {
        status,
        content_type,
        headers,
        body,
    })
}

fn build_client(timeout: Duration, proxy: Option<Proxy>) -> Result<Client, ConfigError> {
    let mut builder = Client::builder().timeout(timeout);
    if let Some(proxy) = proxy {
        builder = builder.proxy(proxy);
    }
    builder.build().map_err(|e| ConfigError::InvalidValue {
        field: "http client",
        value: e.to_string(),
    })
}

fn invalid_url(field: &'static str, url: &Url) -> ConfigError {
    ConfigError::InvalidUrl {
        field,
        value: redact_url(url),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_test::traced_test;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_edge_relay_url_carries_target() {
        let relay = url("https://relay.example/");
        let target = url("https://www.law.go.kr/DRF/lawSearch.do?OC=test&query=민법");
        let out = edge_relay_url(&relay, &target, None, ApiKeyPlacement::Header);

        let pairs: Vec<(String, String)> = out.query_pairs().into_owned().collect();
        assert_eq!(pairs, vec![("url".to_string(), target.to_string())]);
        assert_eq!(out.host_str(), Some("relay.example"));
    }

    #[test]
    fn test_edge_relay_url_query_key() {
        let relay = url("https://relay.example/");
        let target = url("https://law.go.kr/");
        let out = edge_relay_url(&relay, &target, Some("k1"), ApiKeyPlacement::Query);
        let pairs: Vec<(String, String)> = out.query_pairs().into_owned().collect();
        assert!(pairs.contains(&("api_key".to_string(), "k1".to_string())));
    }

    #[test]
    fn test_edge_relay_url_header_key_not_in_query() {
        let relay = url("https://relay.example/");
        let target = url("https://law.go.kr/");
        let out = edge_relay_url(&relay, &target, Some("k1"), ApiKeyPlacement::Header);
        assert!(!out.as_str().contains("k1"));
    }

    #[test]
    fn test_edge_relay_url_keeps_existing_query() {
        let relay = url("https://relay.example/fetch?v=2");
        let target = url("https://law.go.kr/");
        let out = edge_relay_url(&relay, &target, None, ApiKeyPlacement::Header);
        assert_eq!(out.path(), "/fetch");
        assert_eq!(out.query_pairs().count(), 2);
    }

    #[test]
    fn test_new_for_each_backend() {
        let mut config = ProxyConfig::default();
        assert_eq!(RelayClient::new(&config).unwrap().proxy_type(), ProxyType::None);

        config.backend = ProxyBackend::Residential {
            gateway: url("http://gate.example:7000"),
            username: "user".to_string(),
            password: "pass".to_string(),
        };
        assert_eq!(
            RelayClient::new(&config).unwrap().proxy_type(),
            ProxyType::Residential
        );

        config.backend = ProxyBackend::GenericHttp {
            proxy_url: url("http://user:pw@proxy.example:3128"),
            username: None,
            password: None,
        };
        let client = RelayClient::new(&config).unwrap();
        assert_eq!(client.proxy_type(), ProxyType::GenericHttp);
        assert_eq!(client.timeout(), Duration::from_secs(30));
    }

    #[test]
    #[traced_test]
    fn test_password_without_username_is_reported() {
        let config = ProxyConfig {
            backend: ProxyBackend::GenericHttp {
                proxy_url: url("http://proxy.example:3128"),
                username: None,
                password: Some("hunter2".to_string()),
            },
            ..ProxyConfig::default()
        };
        let client = RelayClient::new(&config).unwrap();
        assert_eq!(client.proxy_type(), ProxyType::GenericHttp);
        assert!(logs_contain("proxy password given without a username"));
        assert!(!logs_contain("hunter2"));
    }

    #[test]
    fn test_dispatcher_port_reports_backend() {
        let client = RelayClient::new(&ProxyConfig::default()).unwrap();
        let port: &dyn RelayDispatcher = &client;
        assert_eq!(port.proxy_type(), ProxyType::None);
    }
}
