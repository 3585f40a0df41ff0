//! Adapters Layer
//!
//! Inbound adapters receive requests (the relay HTTP server); outbound
//! adapters reach the network (geolocation lookup, relay client).

pub mod inbound;
pub mod outbound;
