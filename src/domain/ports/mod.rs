mod geo_locator;
mod relay_dispatcher;
mod upstream_fetcher;

pub use geo_locator::GeoLocator;
pub use relay_dispatcher::RelayDispatcher;
pub use upstream_fetcher::UpstreamFetcher;
