//! Relay HTTP Server
//!
//! Axum front end of the relay service. Handles CORS preflight, lifts the
//! inbound request into an [`InboundRelay`], and renders results and
//! [`RelayError`]s as HTTP responses.

use crate::application::{Forwarded, InboundRelay, RelayService, USAGE_HINT};
use crate::domain::errors::RelayError;
use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, Query, Request, State},
    http::{header, HeaderMap, HeaderName, HeaderValue, Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

pub const PROXIED_FROM_HEADER: &str = "x-proxied-from";
pub const API_KEY_HEADER: &str = "x-api-key";
pub const FALLBACK_CONTENT_TYPE: &str = "text/plain; charset=utf-8";

/// Query parameters understood by the relay endpoint.
#[derive(Debug, Default, Deserialize)]
pub struct RelayParams {
    pub url: Option<String>,
    pub api_key: Option<String>,
}

/// Health response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub allowed_domains: Vec<String>,
    pub auth_required: bool,
}

#[derive(Clone)]
pub struct RelayState {
    pub service: Arc<RelayService>,
}

impl RelayState {
    pub fn new(service: RelayService) -> Self {
        Self {
            service: Arc::new(service),
        }
    }
}

/// Build the relay router. Exposed for in-process tests.
///
/// Every response leaving the router carries the CORS headers, including
/// axum's own rejections, and OPTIONS is answered on any path before routing.
pub fn router(state: RelayState) -> Router {
    Router::new()
        .route("/health", get(health_handler).fallback(relay_handler))
        .fallback(relay_handler)
        .layer(middleware::from_fn(answer_preflight))
        .layer(middleware::map_response(add_cors))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub struct RelayServer {
    listen_addr: String,
    state: RelayState,
}

impl RelayServer {
    pub fn new(listen_addr: String, service: RelayService) -> Self {
        Self {
            listen_addr,
            state: RelayState::new(service),
        }
    }

    pub fn state(&self) -> RelayState {
        self.state.clone()
    }

    /// Serve until `shutdown` resolves, then drain in-flight requests.
    pub async fn run<F>(&self, shutdown: F) -> anyhow::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind(&self.listen_addr).await?;
        tracing::info!("relay listening on {}", self.listen_addr);
        self.serve(listener, shutdown).await
    }

    /// Serve on an already bound listener.
    pub async fn serve<F>(&self, listener: TcpListener, shutdown: F) -> anyhow::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let app = router(self.state.clone());
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await?;
        Ok(())
    }
}

// Handler functions

async fn health_handler(State(state): State<RelayState>) -> Response {
    let response = HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        allowed_domains: state.service.allowed_domains().to_vec(),
        auth_required: state.service.requires_key(),
    };
    Json(response).into_response()
}

async fn relay_handler(
    State(state): State<RelayState>,
    method: Method,
    headers: HeaderMap,
    params: Option<Query<RelayParams>>,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    let params = params.map(|Query(p)| p).unwrap_or_default();
    let api_key = header_str(&headers, API_KEY_HEADER).or(params.api_key);

    // An unreadable body is reported only to callers that passed auth.
    let body = match body {
        Ok(body) => body,
        Err(rejection) => {
            if let Err(err) = state.service.authorize(api_key.as_deref()) {
                tracing::warn!("rejected relay request: invalid API key");
                return err.into_response();
            }
            return rejection.into_response();
        }
    };

    let Some(method) = to_reqwest_method(&method) else {
        return StatusCode::METHOD_NOT_ALLOWED.into_response();
    };

    let inbound = InboundRelay {
        method,
        target: params.url,
        api_key,
        content_type: header_str(&headers, header::CONTENT_TYPE.as_str()),
        body: (!body.is_empty()).then_some(body),
    };

    match state.service.handle(inbound).await {
        Ok(forwarded) => forwarded_response(forwarded),
        Err(err) => err.into_response(),
    }
}

// Preflight never reaches routing, auth or the body limit.
async fn answer_preflight(request: Request, next: Next) -> Response {
    if request.method() == Method::OPTIONS {
        return StatusCode::OK.into_response();
    }
    next.run(request).await
}

async fn add_cors(resp: Response) -> Response {
    with_cors(resp)
}

fn forwarded_response(forwarded: Forwarded) -> Response {
    let Forwarded { host, response } = forwarded;

    let status = StatusCode::from_u16(response.status.as_u16()).unwrap_or(StatusCode::BAD_GATEWAY);
    let content_type = response
        .content_type
        .as_deref()
        .and_then(|ct| HeaderValue::from_str(ct).ok())
        .unwrap_or_else(|| HeaderValue::from_static(FALLBACK_CONTENT_TYPE));

    let mut resp = (status, response.body).into_response();
    let headers = resp.headers_mut();
    headers.insert(header::CONTENT_TYPE, content_type);
    if let Ok(value) = HeaderValue::from_str(&host) {
        headers.insert(HeaderName::from_static(PROXIED_FROM_HEADER), value);
    }
    resp
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            RelayError::Auth => (
                StatusCode::UNAUTHORIZED,
                serde_json::json!({ "error": "Invalid API key" }),
            ),
            RelayError::MissingUrl { allowed_domains } => (
                StatusCode::BAD_REQUEST,
                serde_json::json!({
                    "error": "Missing url parameter",
                    "usage": USAGE_HINT,
                    "allowed_domains": allowed_domains,
                }),
            ),
            RelayError::InvalidUrl { url, reason } => (
                StatusCode::BAD_REQUEST,
                serde_json::json!({
                    "error": "Invalid URL",
                    "url": url,
                    "message": reason,
                }),
            ),
            RelayError::DomainNotAllowed {
                domain,
                allowed_domains,
            } => (
                StatusCode::FORBIDDEN,
                serde_json::json!({
                    "error": "domain not allowed",
                    "domain": domain,
                    "allowed_domains": allowed_domains,
                }),
            ),
            RelayError::Upstream(err) => {
                let status = if err.is_timeout() {
                    StatusCode::GATEWAY_TIMEOUT
                } else {
                    StatusCode::INTERNAL_SERVER_ERROR
                };
                (
                    status,
                    serde_json::json!({
                        "error": "Proxy error",
                        "message": err.to_string(),
                        "kind": err.kind.as_str(),
                    }),
                )
            }
        };
        (status, Json(body)).into_response()
    }
}

/// Attach the CORS headers every relay response carries.
pub fn with_cors(mut resp: Response) -> Response {
    let headers = resp.headers_mut();
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, POST, OPTIONS"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Content-Type, X-API-Key"),
    );
    headers.insert(
        header::ACCESS_CONTROL_EXPOSE_HEADERS,
        HeaderValue::from_static("X-Proxied-From"),
    );
    headers.insert(
        header::ACCESS_CONTROL_MAX_AGE,
        HeaderValue::from_static("86400"),
    );
    resp
}

fn header_str(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

// axum and reqwest sit on different `http` major versions.
fn to_reqwest_method(method: &Method) -> Option<reqwest::Method> {
    reqwest::Method::from_bytes(method.as_str().as_bytes()).ok()
}
