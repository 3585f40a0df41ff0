//! Relay Service - allowlisting forwarder use case
//!
//! Runs the gates of one inbound relay request in order:
//! auth, URL extraction, URL validation, domain check, then the fetch.
//! The HTTP adapter owns CORS and rendering; this type owns policy.

use crate::domain::entities::{RelayRequest, RelayResponse};
use crate::domain::errors::{RelayError, UpstreamError};
use crate::domain::ports::UpstreamFetcher;
use crate::domain::value_objects::AllowedDomains;
use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::{Method, Url};
use std::sync::Arc;
use std::time::Instant;

pub const USAGE_HINT: &str = "/?url=https://www.law.go.kr/DRF/lawSearch.do?OC=...&target=law&query=...";

/// One inbound request, already lifted out of the HTTP framework.
#[derive(Debug, Clone, Default)]
pub struct InboundRelay {
    pub method: Method,
    /// Raw value of the `url` query parameter
    pub target: Option<String>,
    /// Key from the `X-API-Key` header, else the `api_key` query parameter
    pub api_key: Option<String>,
    pub content_type: Option<String>,
    pub body: Option<Bytes>,
}

/// A successful forward: the upstream response and the host it came from.
#[derive(Debug, Clone)]
pub struct Forwarded {
    pub host: String,
    pub response: RelayResponse,
}

pub struct RelayService {
    api_key: Option<String>,
    allowed: Arc<AllowedDomains>,
    upstream: Arc<dyn UpstreamFetcher>,
}

impl RelayService {
    pub fn new(
        api_key: Option<String>,
        allowed: Arc<AllowedDomains>,
        upstream: Arc<dyn UpstreamFetcher>,
    ) -> Self {
        Self {
            api_key,
            allowed,
            upstream,
        }
    }

    pub fn allowed_domains(&self) -> &AllowedDomains {
        &self.allowed
    }

    pub fn requires_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// AUTH_CHECK. No configured key means every caller passes.
    pub fn authorize(&self, presented: Option<&str>) -> Result<(), RelayError> {
        match &self.api_key {
            None => Ok(()),
            Some(expected) if presented == Some(expected.as_str()) => Ok(()),
            Some(_) => Err(RelayError::Auth),
        }
    }

    /// URL_EXTRACT, URL_VALIDATE and DOMAIN_CHECK.
    ///
    /// Returns the parsed target and its lower-cased host.
    pub fn validate_target(&self, raw: Option<&str>) -> Result<(Url, String), RelayError> {
        let raw = raw
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| RelayError::MissingUrl {
                allowed_domains: self.allowed.to_vec(),
            })?;

        let url = Url::parse(raw).map_err(|e| RelayError::InvalidUrl {
            url: raw.to_string(),
            reason: e.to_string(),
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(RelayError::InvalidUrl {
                url: raw.to_string(),
                reason: format!("unsupported scheme '{}'", url.scheme()),
            });
        }
        let host = match url.host_str() {
            Some(h) if !h.is_empty() => h.to_lowercase(),
            _ => {
                return Err(RelayError::InvalidUrl {
                    url: raw.to_string(),
                    reason: "missing host".to_string(),
                })
            }
        };

        if !self.allowed.permits(&host) {
            return Err(RelayError::DomainNotAllowed {
                domain: host,
                allowed_domains: self.allowed.to_vec(),
            });
        }

        Ok((url, host))
    }

    /// FORWARD. Single attempt; the fetcher's timeout bounds it.
    pub async fn forward(
        &self,
        method: Method,
        url: Url,
        content_type: Option<&str>,
        body: Option<Bytes>,
    ) -> Result<RelayResponse, UpstreamError> {
        let mut request = RelayRequest::new(method, url);
        if let Some(body) = body.filter(|b| !b.is_empty()) {
            if let Some(ct) = content_type.and_then(|ct| HeaderValue::from_str(ct).ok()) {
                let mut headers = HeaderMap::new();
                headers.insert(CONTENT_TYPE, ct);
                request = request.with_headers(headers);
            }
            request = request.with_body(body);
        }
        self.upstream.fetch(request).await
    }

    /// Run every gate, then forward. Auth precedes the domain check.
    pub async fn handle(&self, inbound: InboundRelay) -> Result<Forwarded, RelayError> {
        if let Err(err) = self.authorize(inbound.api_key.as_deref()) {
            tracing::warn!("rejected relay request: invalid API key");
            return Err(err);
        }

        let (url, host) = match self.validate_target(inbound.target.as_deref()) {
            Ok(target) => target,
            Err(err) => {
                tracing::warn!("rejected relay request: {}", err);
                return Err(err);
            }
        };

        let started = Instant::now();
        let method = inbound.method.clone();
        match self
            .forward(method, url.clone(), inbound.content_type.as_deref(), inbound.body)
            .await
        {
            Ok(response) => {
                tracing::info!(
                    "relayed {} {} -> {} in {}ms",
                    inbound.method,
                    host,
                    response.status.as_u16(),
                    started.elapsed().as_millis()
                );
                Ok(Forwarded { host, response })
            }
            Err(err) => {
                tracing::error!("relay to {} failed: {}", host, err);
                Err(err.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tracing_test::traced_test;

    // ===== Mock Implementations =====

    struct RecordingFetcher {
        seen: Mutex<Vec<RelayRequest>>,
    }

    impl RecordingFetcher {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                seen: Mutex::new(Vec::new()),
            })
        }

        fn seen(&self) -> Vec<RelayRequest> {
            self.seen.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl UpstreamFetcher for RecordingFetcher {
        async fn fetch(&self, request: RelayRequest) -> Result<RelayResponse, UpstreamError> {
            self.seen.lock().unwrap().push(request);
            Ok(RelayResponse {
                status: reqwest::StatusCode::OK,
                content_type: Some("application/json".to_string()),
                headers: HeaderMap::new(),
                body: Bytes::from_static(b"{}"),
            })
        }
    }

    fn service_with(api_key: Option<&str>, upstream: Arc<RecordingFetcher>) -> RelayService {
        RelayService::new(
            api_key.map(String::from),
            Arc::new(AllowedDomains::new(["law.go.kr", "assembly.go.kr"])),
            upstream,
        )
    }

    fn service(api_key: Option<&str>) -> RelayService {
        service_with(api_key, RecordingFetcher::new())
    }

    #[test]
    fn test_authorize_without_key_is_noop() {
        let svc = service(None);
        assert!(!svc.requires_key());
        assert!(svc.authorize(None).is_ok());
        assert!(svc.authorize(Some("anything")).is_ok());
    }

    #[test]
    fn test_authorize_with_key() {
        let svc = service(Some("s3cret"));
        assert!(svc.requires_key());
        assert!(svc.authorize(Some("s3cret")).is_ok());
        assert!(matches!(svc.authorize(Some("wrong")), Err(RelayError::Auth)));
        assert!(matches!(svc.authorize(None), Err(RelayError::Auth)));
    }

    #[test]
    fn test_validate_missing_url() {
        let svc = service(None);
        for raw in [None, Some(""), Some("   ")] {
            match svc.validate_target(raw) {
                Err(RelayError::MissingUrl { allowed_domains }) => {
                    assert!(allowed_domains.contains(&"law.go.kr".to_string()));
                }
                other => panic!("unexpected {:?}", other),
            }
        }
    }

    #[test]
    fn test_validate_malformed_url() {
        let svc = service(None);
        assert!(matches!(
            svc.validate_target(Some("not a url")),
            Err(RelayError::InvalidUrl { .. })
        ));
        assert!(matches!(
            svc.validate_target(Some("/relative/path")),
            Err(RelayError::InvalidUrl { .. })
        ));
        assert!(matches!(
            svc.validate_target(Some("ftp://law.go.kr/file")),
            Err(RelayError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn test_validate_domain_check() {
        let svc = service(None);
        let (url, host) = svc
            .validate_target(Some("https://OPEN.Law.go.kr/detail?id=1"))
            .unwrap();
        assert_eq!(host, "open.law.go.kr");
        assert_eq!(url.path(), "/detail");

        match svc.validate_target(Some("https://evillaw.go.kr/")) {
            Err(RelayError::DomainNotAllowed {
                domain,
                allowed_domains,
            }) => {
                assert_eq!(domain, "evillaw.go.kr");
                assert_eq!(allowed_domains.len(), 2);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_handle_checks_auth_before_domain() {
        let svc = service(Some("s3cret"));
        let inbound = InboundRelay {
            method: Method::GET,
            target: Some("https://evil.com/".to_string()),
            api_key: None,
            ..Default::default()
        };
        assert!(matches!(svc.handle(inbound).await, Err(RelayError::Auth)));
    }

    #[tokio::test]
    #[traced_test]
    async fn test_handle_rejects_before_forwarding() {
        let upstream = RecordingFetcher::new();
        let svc = service_with(None, upstream.clone());
        let inbound = InboundRelay {
            method: Method::GET,
            target: Some("https://evil.com/".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            svc.handle(inbound).await,
            Err(RelayError::DomainNotAllowed { .. })
        ));
        assert!(logs_contain("domain not allowed: evil.com"));
        assert!(upstream.seen().is_empty());
    }

    #[tokio::test]
    async fn test_handle_forwards_method_body_and_content_type() {
        let upstream = RecordingFetcher::new();
        let svc = service_with(Some("k"), upstream.clone());
        let inbound = InboundRelay {
            method: Method::POST,
            target: Some("https://open.law.go.kr/submit?x=1".to_string()),
            api_key: Some("k".to_string()),
            content_type: Some("application/x-www-form-urlencoded".to_string()),
            body: Some(Bytes::from_static(b"query=1")),
        };
        let forwarded = svc.handle(inbound).await.unwrap();
        assert_eq!(forwarded.host, "open.law.go.kr");
        assert_eq!(forwarded.response.text(), "{}");

        let seen = upstream.seen();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].method, Method::POST);
        assert_eq!(seen[0].url.as_str(), "https://open.law.go.kr/submit?x=1");
        assert_eq!(
            seen[0].headers[CONTENT_TYPE],
            "application/x-www-form-urlencoded"
        );
        assert_eq!(seen[0].body.as_deref(), Some(&b"query=1"[..]));
    }

    #[tokio::test]
    async fn test_forward_drops_content_type_without_body() {
        let upstream = RecordingFetcher::new();
        let svc = service_with(None, upstream.clone());
        svc.forward(
            Method::GET,
            Url::parse("https://law.go.kr/").unwrap(),
            Some("text/plain"),
            Some(Bytes::new()),
        )
        .await
        .unwrap();

        let seen = upstream.seen();
        assert!(seen[0].headers.is_empty());
        assert!(seen[0].body.is_none());
    }
}
