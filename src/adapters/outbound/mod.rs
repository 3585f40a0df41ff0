mod http_forwarder;
mod http_geo_locator;
mod relay_client;

pub use http_forwarder::{HttpForwarder, RELAY_ACCEPT_LANGUAGE, RELAY_USER_AGENT};
pub use http_geo_locator::{parse_lookup_body, HttpGeoLocator};
pub use relay_client::{edge_relay_url, read_response, RelayClient, API_KEY_HEADER};
