//! Relay Dispatcher Port
//!
//! Defines the interface the caller side sends requests through once the
//! routing decision is made.

use crate::domain::entities::{RelayRequest, RelayResponse};
use crate::domain::errors::UpstreamError;
use crate::domain::value_objects::ProxyType;
use async_trait::async_trait;

/// Sends a caller's request either through the configured intermediary or
/// straight to the target.
#[async_trait]
pub trait RelayDispatcher: Send + Sync {
    /// Kind of intermediary behind [`Self::relay`].
    fn proxy_type(&self) -> ProxyType;

    /// Send `request` through the intermediary.
    async fn relay(&self, request: RelayRequest) -> Result<RelayResponse, UpstreamError>;

    /// Send `request` with no intermediary.
    async fn direct(&self, request: RelayRequest) -> Result<RelayResponse, UpstreamError>;
}
