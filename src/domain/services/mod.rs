mod proxy_selector;

pub use proxy_selector::{Decision, DecisionReason, ProxySelector};
