//! Domain Layer
//!
//! Entities, value objects, errors, ports and pure services. Nothing in
//! here performs I/O.

pub mod entities;
pub mod errors;
pub mod ports;
pub mod services;
pub mod value_objects;

pub use entities::{GeoInfo, RelayRequest, RelayResponse};
pub use errors::{ConfigError, GeoLookupError, RelayError, UpstreamError, UpstreamErrorKind};
pub use value_objects::{AllowedDomains, ApiKeyPlacement, ProxyType, RoutingPolicy};
