//! Value Objects - Immutable domain primitives
//!
//! Value objects are identified by their value rather than identity.
//! They are immutable and can be freely shared.

use serde::Serialize;
use std::fmt;

/// Kind of intermediary used to reach a blocked destination.
///
/// This is only the tag; the fields each backend needs are part of the
/// caller-side configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProxyType {
    /// No intermediary configured; requests always go direct
    None,
    /// An allowlisting HTTP forwarder (this crate's relay service)
    EdgeRelay,
    /// A residential proxy gateway authenticated with username/password
    Residential,
    /// Any standard HTTP/HTTPS forward proxy
    GenericHttp,
}

impl ProxyType {
    /// Parse a proxy type from configuration.
    ///
    /// Unlike `RegionCode`-style lookups this has no fallback: an unknown
    /// value returns `None` so configuration can fail fast.
    ///
    /// # Examples
    /// ```
    /// use geo_relay::domain::value_objects::ProxyType;
    ///
    /// assert_eq!(ProxyType::parse("edge-relay"), Some(ProxyType::EdgeRelay));
    /// assert_eq!(ProxyType::parse(""), Some(ProxyType::None));
    /// assert_eq!(ProxyType::parse("carrier-pigeon"), None);
    /// ```
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "" | "none" | "direct" => Some(Self::None),
            "edge-relay" | "edge_relay" | "cloudflare" | "worker" => Some(Self::EdgeRelay),
            "residential" => Some(Self::Residential),
            "generic-http" | "generic_http" | "http" | "https" => Some(Self::GenericHttp),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::EdgeRelay => "edge-relay",
            Self::Residential => "residential",
            Self::GenericHttp => "generic-http",
        }
    }
}

impl fmt::Display for ProxyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything the relay decision needs apart from the caller's location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutingPolicy {
    /// Configured intermediary; [`ProxyType::None`] means direct only
    pub backend: ProxyType,
    pub force_proxy: bool,
    pub skip_geo_check: bool,
    /// Country the caller is not blocked from
    pub home_country: String,
}

impl RoutingPolicy {
    pub fn new(backend: ProxyType, home_country: impl Into<String>) -> Self {
        Self {
            backend,
            force_proxy: false,
            skip_geo_check: false,
            home_country: home_country.into(),
        }
    }

    pub fn with_force_proxy(mut self, force_proxy: bool) -> Self {
        self.force_proxy = force_proxy;
        self
    }

    pub fn with_skip_geo_check(mut self, skip_geo_check: bool) -> Self {
        self.skip_geo_check = skip_geo_check;
        self
    }

    pub fn backend_configured(&self) -> bool {
        self.backend != ProxyType::None
    }
}

/// Where the edge-relay client puts its API key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ApiKeyPlacement {
    /// `X-API-Key` request header
    #[default]
    Header,
    /// `api_key` query parameter, for relays that cannot read headers
    Query,
}

impl ApiKeyPlacement {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "" | "header" => Some(Self::Header),
            "query" => Some(Self::Query),
            _ => None,
        }
    }
}

/// Destination allowlist of the relay service.
///
/// Entries are stored lower-cased and without a leading or trailing dot.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AllowedDomains {
    domains: Vec<String>,
}

impl AllowedDomains {
    pub fn new<I, S>(domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let domains = domains
            .into_iter()
            .map(|d| d.as_ref().trim().trim_matches('.').to_lowercase())
            .filter(|d| !d.is_empty())
            .collect();
        Self { domains }
    }

    /// Parse a comma separated list, e.g. `law.go.kr, assembly.go.kr`.
    pub fn from_csv(s: &str) -> Self {
        Self::new(s.split(','))
    }

    /// Whether `host` may be relayed to.
    ///
    /// A host matches an entry when it is equal to it or ends with `"." + entry`.
    /// `open.law.go.kr` matches `law.go.kr`; `evillaw.go.kr` does not.
    pub fn permits(&self, host: &str) -> bool {
        let host = host.trim_end_matches('.').to_lowercase();
        self.domains
            .iter()
            .any(|domain| host_matches(&host, domain))
    }

    pub fn as_slice(&self) -> &[String] {
        &self.domains
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.domains.clone()
    }

    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
    }
}

/// Exact match or proper suffix on a label boundary. Both sides lower-case.
pub fn host_matches(host: &str, domain: &str) -> bool {
    if host == domain {
        return true;
    }
    host.len() > domain.len()
        && host.ends_with(domain)
        && host.as_bytes()[host.len() - domain.len() - 1] == b'.'
}
