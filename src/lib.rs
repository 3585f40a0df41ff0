//! geo-relay Library
//!
//! Reach geo-blocked HTTP APIs: decide from the caller's location whether a
//! request needs an intermediary, send it through one of three backend
//! kinds, and run the allowlisting relay those requests can target.
//!
//! This module exposes the components for the binaries and integration tests.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;

// Re-export commonly used types
pub use adapters::inbound::{router, RelayServer};
pub use adapters::outbound::{HttpForwarder, HttpGeoLocator, RelayClient};
pub use application::{GeoRouter, RelayService, StatusReport, Verdict};
pub use config::{load_config, Config, ProxyBackend, ProxyConfig};
pub use domain::entities::{GeoInfo, RelayRequest, RelayResponse};
pub use domain::errors::{ConfigError, GeoLookupError, RelayError, UpstreamError, UpstreamErrorKind};
pub use domain::ports::{GeoLocator, RelayDispatcher, UpstreamFetcher};
pub use domain::services::{Decision, DecisionReason, ProxySelector};
pub use domain::value_objects::{AllowedDomains, ProxyType, RoutingPolicy};
