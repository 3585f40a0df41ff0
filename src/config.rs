//! Configuration
//!
//! Two environment-sourced configurations live here:
//! - [`Config`]: the relay service (listen address, API key, allowlist)
//! - [`ProxyConfig`]: the caller side (which intermediary to use and when)
//!
//! Both are built once at startup and shared read-only afterwards.

use crate::domain::errors::ConfigError;
use crate::domain::value_objects::{AllowedDomains, ApiKeyPlacement, ProxyType, RoutingPolicy};
use reqwest::Url;
use std::fmt;
use std::time::Duration;

pub const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:8787";
pub const DEFAULT_ALLOWED_DOMAINS: &str = "law.go.kr,assembly.go.kr";
pub const DEFAULT_HOME_COUNTRY: &str = "KR";
pub const DEFAULT_GEO_LOOKUP_URL: &str = "https://ipinfo.io/json";
pub const DEFAULT_RESIDENTIAL_GATEWAY: &str = "http://gate.residential-proxy.net:7000";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

// ===== Relay service configuration =====

#[derive(Debug, Clone)]
pub struct Config {
    pub listen_addr: String,
    /// Key callers must present; `None` disables the check
    pub api_key: Option<String>,
    pub allowed_domains: AllowedDomains,
    pub upstream_timeout_secs: u64,
    pub debug: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: DEFAULT_LISTEN_ADDR.to_string(),
            api_key: None,
            allowed_domains: AllowedDomains::from_csv(DEFAULT_ALLOWED_DOMAINS),
            upstream_timeout_secs: DEFAULT_TIMEOUT_SECS,
            debug: false,
        }
    }
}

impl Config {
    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_secs(self.upstream_timeout_secs)
    }
}

pub fn load_config() -> anyhow::Result<Config> {
    load_config_from(|key| std::env::var(key).ok())
}

/// Build the relay service configuration from a variable lookup.
pub fn load_config_from<F>(lookup: F) -> anyhow::Result<Config>
where
    F: Fn(&str) -> Option<String>,
{
    let listen_addr = lookup("GEORELAY_LISTEN_ADDR")
        .unwrap_or_else(|| DEFAULT_LISTEN_ADDR.to_string());

    let api_key = lookup("GEORELAY_API_KEY").filter(|k| !k.trim().is_empty());

    let allowed_domains = AllowedDomains::from_csv(
        &lookup("GEORELAY_ALLOWED_DOMAINS")
            .unwrap_or_else(|| DEFAULT_ALLOWED_DOMAINS.to_string()),
    );
    if allowed_domains.is_empty() {
        anyhow::bail!("GEORELAY_ALLOWED_DOMAINS must list at least one domain");
    }

    let upstream_timeout_secs = lookup("GEORELAY_UPSTREAM_TIMEOUT_SECS")
        .unwrap_or_else(|| DEFAULT_TIMEOUT_SECS.to_string())
        .parse()
        .unwrap_or(DEFAULT_TIMEOUT_SECS);

    let debug = lookup("DEBUG").is_some();

    Ok(Config {
        listen_addr,
        api_key,
        allowed_domains,
        upstream_timeout_secs,
        debug,
    })
}

// ===== Caller-side proxy configuration =====

/// A configured intermediary and exactly the fields it needs.
#[derive(Clone, PartialEq, Eq, Default)]
pub enum ProxyBackend {
    #[default]
    None,
    EdgeRelay {
        relay_url: Url,
        api_key: Option<String>,
        key_placement: ApiKeyPlacement,
    },
    Residential {
        gateway: Url,
        username: String,
        password: String,
    },
    GenericHttp {
        proxy_url: Url,
        username: Option<String>,
        password: Option<String>,
    },
}

impl ProxyBackend {
    pub fn proxy_type(&self) -> ProxyType {
        match self {
            Self::None => ProxyType::None,
            Self::EdgeRelay { .. } => ProxyType::EdgeRelay,
            Self::Residential { .. } => ProxyType::Residential,
            Self::GenericHttp { .. } => ProxyType::GenericHttp,
        }
    }

    pub fn is_configured(&self) -> bool {
        !matches!(self, Self::None)
    }
}

// Secrets stay out of logs.
impl fmt::Debug for ProxyBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::EdgeRelay {
                relay_url,
                api_key,
                key_placement,
            } => f
                .debug_struct("EdgeRelay")
                .field("relay_url", &redact_url(relay_url))
                .field("api_key", &api_key.as_ref().map(|_| "***"))
                .field("key_placement", key_placement)
                .finish(),
            Self::Residential {
                gateway, username, ..
            } => f
                .debug_struct("Residential")
                .field("gateway", &redact_url(gateway))
                .field("username", username)
                .field("password", &"***")
                .finish(),
            Self::GenericHttp {
                proxy_url,
                username,
                password,
            } => f
                .debug_struct("GenericHttp")
                .field("proxy_url", &redact_url(proxy_url))
                .field("username", username)
                .field("password", &password.as_ref().map(|_| "***"))
                .finish(),
        }
    }
}

/// URL with any userinfo password masked.
pub fn redact_url(url: &Url) -> String {
    if url.password().is_none() {
        return url.to_string();
    }
    let mut masked = url.clone();
    // Only fails for cannot-be-a-base URLs, which never carry a password.
    let _ = masked.set_password(Some("***"));
    masked.to_string()
}

/// Caller-side proxy settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyConfig {
    pub backend: ProxyBackend,
    pub force_proxy: bool,
    pub skip_geo_check: bool,
    pub home_country: String,
    pub timeout: Duration,
    pub geo_lookup_url: Url,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            backend: ProxyBackend::None,
            force_proxy: false,
            skip_geo_check: false,
            home_country: DEFAULT_HOME_COUNTRY.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            geo_lookup_url: Url::parse(DEFAULT_GEO_LOOKUP_URL)
                .expect("default geo lookup URL is valid"),
        }
    }
}

impl ProxyConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::resolve(|key| std::env::var(key).ok())
    }

    /// Resolve from a variable lookup. Empty values count as unset.
    ///
    /// Fails fast on an unknown proxy type, missing backend fields, or
    /// malformed values. There is no silent fallback to direct access.
    pub fn resolve<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let raw_type = get("GEORELAY_PROXY_TYPE").unwrap_or_default();
        let proxy_type =
            ProxyType::parse(&raw_type).ok_or(ConfigError::UnknownProxyType(raw_type))?;

        let backend = match proxy_type {
            ProxyType::None => ProxyBackend::None,
            ProxyType::EdgeRelay => {
                let relay_url = require_url(&get, "GEORELAY_RELAY_URL", proxy_type)?;
                let key_placement = match get("GEORELAY_RELAY_KEY_PLACEMENT") {
                    Some(v) => ApiKeyPlacement::parse(&v).ok_or(ConfigError::InvalidValue {
                        field: "GEORELAY_RELAY_KEY_PLACEMENT",
                        value: v,
                    })?,
                    None => ApiKeyPlacement::default(),
                };
                ProxyBackend::EdgeRelay {
                    relay_url,
                    api_key: get("GEORELAY_RELAY_API_KEY"),
                    key_placement,
                }
            }
            ProxyType::Residential => {
                let username = get("GEORELAY_PROXY_USERNAME").ok_or(ConfigError::MissingField {
                    proxy_type: proxy_type.as_str(),
                    field: "GEORELAY_PROXY_USERNAME",
                })?;
                let password = get("GEORELAY_PROXY_PASSWORD").ok_or(ConfigError::MissingField {
                    proxy_type: proxy_type.as_str(),
                    field: "GEORELAY_PROXY_PASSWORD",
                })?;
                let gateway = parse_url(
                    "GEORELAY_RESIDENTIAL_GATEWAY",
                    &get("GEORELAY_RESIDENTIAL_GATEWAY")
                        .unwrap_or_else(|| DEFAULT_RESIDENTIAL_GATEWAY.to_string()),
                )?;
                ProxyBackend::Residential {
                    gateway,
                    username,
                    password,
                }
            }
            ProxyType::GenericHttp => {
                let proxy_url = require_url(&get, "GEORELAY_RELAY_URL", proxy_type)?;
                let username = get("GEORELAY_PROXY_USERNAME");
                let password = get("GEORELAY_PROXY_PASSWORD");
                // A password alone would be dropped by the proxy auth header.
                if password.is_some() && username.is_none() {
                    return Err(ConfigError::MissingField {
                        proxy_type: proxy_type.as_str(),
                        field: "GEORELAY_PROXY_USERNAME",
                    });
                }
                ProxyBackend::GenericHttp {
                    proxy_url,
                    username,
                    password,
                }
            }
        };

        let force_proxy = parse_flag("GEORELAY_FORCE_PROXY", get("GEORELAY_FORCE_PROXY"))?;
        let skip_geo_check =
            parse_flag("GEORELAY_SKIP_GEO_CHECK", get("GEORELAY_SKIP_GEO_CHECK"))?;

        let home_country = get("GEORELAY_HOME_COUNTRY")
            .map(|c| c.to_uppercase())
            .unwrap_or_else(|| DEFAULT_HOME_COUNTRY.to_string());

        let timeout = match get("GEORELAY_TIMEOUT_SECS") {
            Some(v) => match v.parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => {
                    return Err(ConfigError::InvalidValue {
                        field: "GEORELAY_TIMEOUT_SECS",
                        value: v,
                    })
                }
            },
            None => Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        };

        let geo_lookup_url = parse_url(
            "GEORELAY_GEO_LOOKUP_URL",
            &get("GEORELAY_GEO_LOOKUP_URL").unwrap_or_else(|| DEFAULT_GEO_LOOKUP_URL.to_string()),
        )?;

        Ok(Self {
            backend,
            force_proxy,
            skip_geo_check,
            home_country,
            timeout,
            geo_lookup_url,
        })
    }

    pub fn proxy_type(&self) -> ProxyType {
        self.backend.proxy_type()
    }

    /// The routing inputs of this configuration.
    pub fn routing_policy(&self) -> RoutingPolicy {
        RoutingPolicy::new(self.proxy_type(), self.home_country.clone())
            .with_force_proxy(self.force_proxy)
            .with_skip_geo_check(self.skip_geo_check)
    }
}

fn require_url<G>(get: &G, field: &'static str, proxy_type: ProxyType) -> Result<Url, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    let value = get(field).ok_or(ConfigError::MissingField {
        proxy_type: proxy_type.as_str(),
        field,
    })?;
    parse_url(field, &value)
}

fn parse_url(field: &'static str, value: &str) -> Result<Url, ConfigError> {
    match Url::parse(value) {
        Ok(url) if matches!(url.scheme(), "http" | "https") && url.has_host() => Ok(url),
        _ => Err(ConfigError::InvalidUrl {
            field,
            value: value.to_string(),
        }),
    }
}

fn parse_flag(field: &'static str, value: Option<String>) -> Result<bool, ConfigError> {
    let Some(value) = value else {
        return Ok(false);
    };
    match value.to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue { field, value }),
    }
}
