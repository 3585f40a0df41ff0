//! Upstream Fetcher Port
//!
//! Defines the interface the relay service forwards through.

use crate::domain::entities::{RelayRequest, RelayResponse};
use crate::domain::errors::UpstreamError;
use async_trait::async_trait;

/// Fetches an already validated target on behalf of a relay caller.
///
/// This is an outbound port. Implementations send the fixed relay identity,
/// keep redirects inside the allowlist and make exactly one attempt.
#[async_trait]
pub trait UpstreamFetcher: Send + Sync {
    /// Send `request` and collect the full response.
    async fn fetch(&self, request: RelayRequest) -> Result<RelayResponse, UpstreamError>;
}
