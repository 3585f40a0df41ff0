//! Geo Router - caller-side use case
//!
//! Decides per request whether to go through the intermediary, then
//! dispatches through the relay port. Stateless between calls.

use crate::domain::entities::{GeoInfo, RelayRequest, RelayResponse};
use crate::domain::errors::{GeoLookupError, UpstreamError};
use crate::domain::ports::{GeoLocator, RelayDispatcher};
use crate::domain::services::{Decision, ProxySelector};
use crate::domain::value_objects::RoutingPolicy;
use std::sync::Arc;

/// A routing decision together with the location it was based on.
#[derive(Debug, Clone)]
pub struct Evaluation {
    /// `None` when the decision did not need a lookup
    pub geo: Option<Result<GeoInfo, GeoLookupError>>,
    pub decision: Decision,
}

pub struct GeoRouter {
    policy: RoutingPolicy,
    locator: Arc<dyn GeoLocator>,
    dispatcher: Arc<dyn RelayDispatcher>,
}

impl GeoRouter {
    pub fn new(
        policy: RoutingPolicy,
        locator: Arc<dyn GeoLocator>,
        dispatcher: Arc<dyn RelayDispatcher>,
    ) -> Self {
        Self {
            policy,
            locator,
            dispatcher,
        }
    }

    pub fn policy(&self) -> &RoutingPolicy {
        &self.policy
    }

    /// Decide, looking up the location only when the flags leave it open.
    pub async fn decide(&self) -> Evaluation {
        match ProxySelector::settle(&self.policy) {
            Some(decision) => Evaluation {
                geo: None,
                decision,
            },
            None => self.evaluate_with_lookup().await,
        }
    }

    /// Decide after an unconditional lookup, for reporting.
    pub async fn inspect(&self) -> Evaluation {
        self.evaluate_with_lookup().await
    }

    async fn evaluate_with_lookup(&self) -> Evaluation {
        let geo = self.locator.locate().await;
        if let Err(err) = &geo {
            tracing::warn!("{}; treating caller as foreign", err);
        }
        let decision = ProxySelector::route(&self.policy, geo.as_ref());
        Evaluation {
            geo: Some(geo),
            decision,
        }
    }

    /// Decide, then send `request` directly or through the backend.
    pub async fn fetch(&self, request: RelayRequest) -> Result<RelayResponse, UpstreamError> {
        let evaluation = self.decide().await;
        let decision = evaluation.decision;

        if !self.policy.backend_configured() {
            if let Some(Ok(geo)) = &evaluation.geo {
                if geo.is_foreign {
                    tracing::warn!(
                        "caller appears to be in {} but no proxy backend is configured",
                        geo.country_or_unknown()
                    );
                }
            }
        }

        tracing::info!(
            "{} {} via {} ({})",
            request.method,
            request.url,
            if decision.must_relay {
                self.dispatcher.proxy_type().as_str()
            } else {
                "direct"
            },
            decision.reason
        );

        if decision.must_relay {
            self.dispatcher.relay(request).await
        } else {
            self.dispatcher.direct(request).await
        }
    }
}
