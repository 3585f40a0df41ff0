//! Application Layer
//!
//! Use cases wiring domain services to adapters.

pub mod geo_router;
pub mod relay_service;
pub mod status;

pub use geo_router::{Evaluation, GeoRouter};
pub use relay_service::{Forwarded, InboundRelay, RelayService, USAGE_HINT};
pub use status::{StatusReport, Verdict};
