//! Proxy Selector Service
//!
//! Pure domain logic deciding whether a request must go through an
//! intermediary. No I/O happens here.

use crate::domain::entities::GeoInfo;
use crate::domain::errors::GeoLookupError;
use crate::domain::value_objects::RoutingPolicy;
use serde::Serialize;
use std::fmt;

/// Why the selector reached its decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionReason {
    /// `force_proxy` is set
    Forced,
    /// `skip_geo_check` is set
    GeoCheckSkipped,
    /// The geolocation lookup failed, so the caller is assumed blocked
    LookupFailed,
    /// The caller is outside the home country
    Foreign,
    /// The caller is inside the home country
    Domestic,
    /// No backend is configured; only direct access is possible
    NoBackend,
}

impl DecisionReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Forced => "force-proxy flag set",
            Self::GeoCheckSkipped => "geo check skipped",
            Self::LookupFailed => "geolocation failed, assuming foreign",
            Self::Foreign => "caller is abroad",
            Self::Domestic => "caller is in the home country",
            Self::NoBackend => "no proxy backend configured",
        }
    }
}

impl fmt::Display for DecisionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of [`ProxySelector::decide`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Decision {
    pub must_relay: bool,
    pub reason: DecisionReason,
}

impl Decision {
    fn relay(reason: DecisionReason) -> Self {
        Self {
            must_relay: true,
            reason,
        }
    }

    fn direct(reason: DecisionReason) -> Self {
        Self {
            must_relay: false,
            reason,
        }
    }
}

/// Combines override flags and geolocation into one "must relay" answer.
///
/// Precedence, first match wins:
/// 1. `force_proxy` relays, whatever else is set
/// 2. `skip_geo_check` goes direct
/// 3. a failed lookup relays
/// 4. otherwise relay iff the caller is foreign
pub struct ProxySelector;

impl ProxySelector {
    /// Decide from explicit flags and the lookup outcome.
    ///
    /// This does not look at the configured backend; use [`Self::route`]
    /// for the full caller-side rule.
    pub fn decide(policy: &RoutingPolicy, geo: Result<&GeoInfo, &GeoLookupError>) -> Decision {
        if policy.force_proxy {
            return Decision::relay(DecisionReason::Forced);
        }
        if policy.skip_geo_check {
            return Decision::direct(DecisionReason::GeoCheckSkipped);
        }
        match geo {
            Err(_) => Decision::relay(DecisionReason::LookupFailed),
            Ok(info) if info.is_foreign => Decision::relay(DecisionReason::Foreign),
            Ok(_) => Decision::direct(DecisionReason::Domestic),
        }
    }

    /// The decision when the policy alone settles it, `None` when the
    /// caller's location is needed.
    pub fn settle(policy: &RoutingPolicy) -> Option<Decision> {
        if !policy.backend_configured() {
            Some(Decision::direct(DecisionReason::NoBackend))
        } else if policy.force_proxy {
            Some(Decision::relay(DecisionReason::Forced))
        } else if policy.skip_geo_check {
            Some(Decision::direct(DecisionReason::GeoCheckSkipped))
        } else {
            None
        }
    }

    /// Whether the selector needs a geolocation result at all.
    pub fn needs_lookup(policy: &RoutingPolicy) -> bool {
        Self::settle(policy).is_none()
    }

    /// Full caller-side rule: with no backend configured the answer is always
    /// direct, and the selector is not consulted.
    pub fn route(policy: &RoutingPolicy, geo: Result<&GeoInfo, &GeoLookupError>) -> Decision {
        Self::settle(policy).unwrap_or_else(|| Self::decide(policy, geo))
    }
}
