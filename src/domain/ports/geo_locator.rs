//! Geo Locator Port
//!
//! Defines the interface for discovering the caller's own network location.

use crate::domain::entities::GeoInfo;
use crate::domain::errors::GeoLookupError;
use async_trait::async_trait;

/// Finds the caller's apparent egress IP and country.
///
/// This is an outbound port. Implementations make one attempt per call and
/// never cache: the egress path may change between invocations.
#[async_trait]
pub trait GeoLocator: Send + Sync {
    /// Look up the current location.
    ///
    /// Fails only when the lookup service cannot be reached at all. Any
    /// response yields a `GeoInfo`, with an unknown country counted as foreign.
    async fn locate(&self) -> Result<GeoInfo, GeoLookupError>;
}
