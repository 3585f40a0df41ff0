//! Status Report
//!
//! Human-readable summary of where the caller is and what the router would
//! do. Built from the same evaluation the router uses for real requests.

use crate::application::geo_router::Evaluation;
use crate::domain::services::Decision;
use crate::domain::value_objects::{ProxyType, RoutingPolicy};
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Ok,
    NeedsAttention,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ok => f.write_str("ok"),
            Self::NeedsAttention => f.write_str("needs attention"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub ip: Option<String>,
    pub country: Option<String>,
    pub is_foreign: Option<bool>,
    pub lookup_error: Option<String>,
    pub home_country: String,
    pub proxy_type: ProxyType,
    pub force_proxy: bool,
    pub skip_geo_check: bool,
    pub decision: Decision,
    pub verdict: Verdict,
    pub notes: Vec<String>,
}

impl StatusReport {
    pub fn new(policy: &RoutingPolicy, evaluation: &Evaluation) -> Self {
        let (ip, country, is_foreign, lookup_error) = match &evaluation.geo {
            Some(Ok(geo)) => (
                Some(geo.ip.clone()),
                geo.country_code.clone(),
                Some(geo.is_foreign),
                None,
            ),
            Some(Err(err)) => (None, None, None, Some(err.to_string())),
            None => (None, None, None, None),
        };

        let configured = policy.backend_configured();
        // A failed lookup counts as foreign, matching the selector.
        let looks_blocked = is_foreign.unwrap_or(true);

        let mut notes = Vec::new();
        let mut verdict = Verdict::Ok;

        if !configured && looks_blocked {
            verdict = Verdict::NeedsAttention;
            notes.push(if lookup_error.is_some() {
                "location unknown and no proxy backend configured; set GEORELAY_PROXY_TYPE"
                    .to_string()
            } else {
                format!(
                    "caller is outside {} but no proxy backend is configured; set GEORELAY_PROXY_TYPE",
                    policy.home_country
                )
            });
        }
        if configured && policy.skip_geo_check && !policy.force_proxy && looks_blocked {
            verdict = Verdict::NeedsAttention;
            notes.push("geo check skipped while caller looks foreign; requests go direct".to_string());
        }
        if policy.force_proxy && policy.skip_geo_check {
            notes.push("force-proxy and skip-geo-check both set; force-proxy wins".to_string());
        }
        if lookup_error.is_some() && configured {
            notes.push("geolocation failed; relaying as a precaution".to_string());
        }

        Self {
            ip,
            country,
            is_foreign,
            lookup_error,
            home_country: policy.home_country.clone(),
            proxy_type: policy.backend,
            force_proxy: policy.force_proxy,
            skip_geo_check: policy.skip_geo_check,
            decision: evaluation.decision,
            verdict,
            notes,
        }
    }
}

impl fmt::Display for StatusReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Current IP:      {}", self.ip.as_deref().unwrap_or("unknown"))?;
        writeln!(
            f,
            "Country:         {}",
            self.country.as_deref().unwrap_or("unknown")
        )?;
        let foreign = match self.is_foreign {
            Some(true) => "yes".to_string(),
            Some(false) => "no".to_string(),
            None => "unknown (assumed yes)".to_string(),
        };
        writeln!(f, "Foreign:         {} (home {})", foreign, self.home_country)?;
        if let Some(err) = &self.lookup_error {
            writeln!(f, "Lookup error:    {}", err)?;
        }
        writeln!(f, "Proxy backend:   {}", self.proxy_type)?;
        writeln!(
            f,
            "Route:           {} ({})",
            if self.decision.must_relay { "relay" } else { "direct" },
            self.decision.reason
        )?;
        for note in &self.notes {
            writeln!(f, "Note:            {}", note)?;
        }
        write!(f, "Status:          {}", self.verdict)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::GeoInfo;
    use crate::domain::errors::GeoLookupError;
    use crate::domain::services::ProxySelector;

    fn evaluate(policy: &RoutingPolicy, geo: Result<GeoInfo, GeoLookupError>) -> Evaluation {
        let decision = ProxySelector::route(policy, geo.as_ref());
        Evaluation {
            geo: Some(geo),
            decision,
        }
    }

    fn edge_config() -> RoutingPolicy {
        RoutingPolicy::new(ProxyType::EdgeRelay, "KR")
    }

    fn direct_only() -> RoutingPolicy {
        RoutingPolicy::new(ProxyType::None, "KR")
    }

    #[test]
    fn test_domestic_without_backend_is_ok() {
        let config = direct_only();
        let eval = evaluate(&config, Ok(GeoInfo::new("211.234.10.1", Some("KR".into()), "KR")));
        let report = StatusReport::new(&config, &eval);
        assert_eq!(report.verdict, Verdict::Ok);
        assert!(!report.decision.must_relay);
    }

    #[test]
    fn test_foreign_without_backend_needs_attention() {
        let config = direct_only();
        let eval = evaluate(&config, Ok(GeoInfo::new("8.8.8.8", Some("US".into()), "KR")));
        let report = StatusReport::new(&config, &eval);
        assert_eq!(report.verdict, Verdict::NeedsAttention);
        assert!(report.notes[0].contains("GEORELAY_PROXY_TYPE"));
    }

    #[test]
    fn test_foreign_with_backend_is_ok() {
        let config = edge_config();
        let eval = evaluate(&config, Ok(GeoInfo::new("8.8.8.8", Some("US".into()), "KR")));
        let report = StatusReport::new(&config, &eval);
        assert_eq!(report.verdict, Verdict::Ok);
        assert!(report.decision.must_relay);
        assert_eq!(report.proxy_type, ProxyType::EdgeRelay);
    }

    #[test]
    fn test_lookup_failure_without_backend_needs_attention() {
        let config = direct_only();
        let eval = evaluate(&config, Err(GeoLookupError("timed out".into())));
        let report = StatusReport::new(&config, &eval);
        assert_eq!(report.verdict, Verdict::NeedsAttention);
        assert!(report.lookup_error.is_some());
    }

    #[test]
    fn test_skip_geo_check_while_foreign_needs_attention() {
        let config = edge_config().with_skip_geo_check(true);
        let eval = evaluate(&config, Ok(GeoInfo::new("8.8.8.8", Some("US".into()), "KR")));
        let report = StatusReport::new(&config, &eval);
        assert_eq!(report.verdict, Verdict::NeedsAttention);
        assert!(!report.decision.must_relay);
    }

    #[test]
    fn test_display_summary() {
        let config = edge_config();
        let eval = evaluate(&config, Ok(GeoInfo::new("8.8.8.8", Some("US".into()), "KR")));
        let text = StatusReport::new(&config, &eval).to_string();
        assert!(text.contains("Current IP:      8.8.8.8"));
        assert!(text.contains("Country:         US"));
        assert!(text.contains("Foreign:         yes (home KR)"));
        assert!(text.contains("Proxy backend:   edge-relay"));
        assert!(text.contains("Route:           relay (caller is abroad)"));
        assert!(text.ends_with("Status:          ok"));
    }

    #[test]
    fn test_serializes_to_json() {
        let config = direct_only();
        let eval = evaluate(&config, Err(GeoLookupError("dns".into())));
        let json = serde_json::to_value(StatusReport::new(&config, &eval)).unwrap();
        assert_eq!(json["verdict"], "needs_attention");
        assert_eq!(json["proxy_type"], "none");
        assert_eq!(json["decision"]["reason"], "no_backend");
    }
}
