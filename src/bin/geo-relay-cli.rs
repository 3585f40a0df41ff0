//! geo-relay-cli - caller-side front end
//!
//! `status` reports location and routing; `fetch` sends one request through
//! the same routing the library uses.

use anyhow::Context;
use clap::{Parser, Subcommand};
use geo_relay::infrastructure::init_tracing;
use geo_relay::{
    GeoRouter, HttpGeoLocator, ProxyConfig, RelayClient, RelayRequest, StatusReport, Verdict,
};
use reqwest::{Method, Url};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;

#[derive(Parser)]
#[command(name = "geo-relay-cli")]
#[command(about = "Reach geo-blocked HTTP APIs through a relay when needed", long_about = None)]
#[command(version)]
struct Cli {
    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show current IP, country and the routing decision
    Status {
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Fetch a URL, relaying if the current location requires it
    Fetch {
        /// Target URL
        url: String,

        /// HTTP method
        #[arg(short = 'X', long, default_value = "GET")]
        method: String,

        /// Request body
        #[arg(short, long)]
        data: Option<String>,

        /// Print the response status and content type to stderr
        #[arg(short, long)]
        include: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose || std::env::var("DEBUG").is_ok());

    let config = ProxyConfig::from_env().context("invalid proxy configuration")?;
    tracing::debug!("proxy config: {:?}", config);
    let locator = HttpGeoLocator::from_config(&config).context("failed to set up geolocation")?;
    let client = RelayClient::new(&config).context("failed to set up proxy backend")?;
    let router = GeoRouter::new(config.routing_policy(), Arc::new(locator), Arc::new(client));

    match cli.command {
        Commands::Status { json } => {
            let evaluation = router.inspect().await;
            let report = StatusReport::new(router.policy(), &evaluation);
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("{}", report);
            }
            if report.verdict == Verdict::NeedsAttention {
                std::process::exit(2);
            }
        }
        Commands::Fetch {
            url,
            method,
            data,
            include,
        } => {
            let url = Url::parse(&url).with_context(|| format!("invalid URL: {}", url))?;
            let method = Method::from_bytes(method.to_uppercase().as_bytes())
                .with_context(|| format!("invalid method: {}", method))?;

            let mut request = RelayRequest::new(method, url);
            if let Some(body) = data {
                request = request.with_body(body);
            }

            let response = router.fetch(request).await?;
            if include {
                eprintln!(
                    "{} {}",
                    response.status,
                    response.content_type.as_deref().unwrap_or("-")
                );
            }

            let mut stdout = tokio::io::stdout();
            stdout.write_all(&response.body).await?;
            stdout.flush().await?;

            if !response.status.is_success() {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_fetch() {
        let cli = Cli::parse_from([
            "geo-relay-cli",
            "fetch",
            "https://www.law.go.kr/DRF/lawSearch.do",
            "-X",
            "post",
            "--data",
            "a=1",
        ]);
        match cli.command {
            Commands::Fetch {
                url, method, data, ..
            } => {
                assert_eq!(url, "https://www.law.go.kr/DRF/lawSearch.do");
                assert_eq!(method, "post");
                assert_eq!(data.as_deref(), Some("a=1"));
            }
            _ => panic!("expected fetch"),
        }
    }

    #[test]
    fn test_parse_status_json() {
        let cli = Cli::parse_from(["geo-relay-cli", "-v", "status", "--json"]);
        assert!(cli.verbose);
        assert!(matches!(cli.command, Commands::Status { json: true }));
    }
}
