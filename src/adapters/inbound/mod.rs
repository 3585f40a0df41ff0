mod relay_server;

pub use relay_server::{router, RelayServer, RelayState};

// Re-export for external use (e.g., integration tests)
#[allow(unused_imports)]
pub use relay_server::{
    with_cors, HealthResponse, RelayParams, FALLBACK_CONTENT_TYPE, PROXIED_FROM_HEADER,
};
