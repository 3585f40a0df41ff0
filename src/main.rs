//! geo-relay - allowlisting HTTP relay
//!
//! This is the composition root of the relay service.

use geo_relay::config::load_config;
use geo_relay::infrastructure::{init_tracing, shutdown_signal};
use geo_relay::{HttpForwarder, RelayServer, RelayService};
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration from environment
    let cfg = load_config()?;

    init_tracing(cfg.debug);

    tracing::info!(
        "starting geo-relay listen={} allowed={} auth={}",
        cfg.listen_addr,
        cfg.allowed_domains.as_slice().join(","),
        if cfg.api_key.is_some() { "on" } else { "off" }
    );

    // Outbound adapter, then the use case over its port
    let forwarder = HttpForwarder::from_config(&cfg)?;
    let service = RelayService::new(
        cfg.api_key.clone(),
        forwarder.allowed_domains(),
        Arc::new(forwarder),
    );
    let server = RelayServer::new(cfg.listen_addr.clone(), service);

    server.run(shutdown_signal()).await?;

    tracing::info!("geo-relay stopped");
    Ok(())
}
