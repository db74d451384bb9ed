//! tokenauth issues and validates RSA-signed bearer tokens.
#![forbid(unsafe_code)]
#![deny(unused_mut)]

mod clock;
pub mod error;
pub mod key;
mod middleware;
pub mod response;
mod router;
pub mod telemetry;
pub mod token;
mod well_known;

pub mod config;

use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use axum::http::{Method, StatusCode, header};
use axum::routing::{get, post};
use axum::{Router, middleware as AxumMiddleware};
use error::ServerError;
use key::{KeyPair, PublicKey};
use metrics_exporter_prometheus::PrometheusHandle;
use response::RejectionPolicy;
use token::TokenService;
use tower::ServiceBuilder;
use tower_http::LatencyUnit;
use tower_http::cors::{Any, CorsLayer};
use tower_http::sensitive_headers::SetSensitiveHeadersLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{
    DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer,
};

/// MUST NEVER be used in production.
#[cfg(test)]
pub async fn make_request(
    token: Option<&str>,
    app: Router,
    method: Method,
    path: &str,
    body: String,
) -> axum::http::Response<axum::body::Body> {
    use axum::extract::Request;
    use tower::util::ServiceExt;

    let mut request = Request::builder()
        .method(method)
        .uri(path)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }

    app.oneshot(request.body(axum::body::Body::from(body)).unwrap())
        .await
        .unwrap()
}

/// State sharing between routes.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<config::Configuration>,
    pub token: TokenService,
    pub public_key: Arc<PublicKey>,
    pub policy: RejectionPolicy,
    pub metrics: Option<PrometheusHandle>,
}

/// Create router.
pub fn app(state: AppState) -> Router {
    let middleware = ServiceBuilder::new()
        // Add high level tracing/logging to all requests.
        .layer(
            TraceLayer::new_for_http()
                .on_body_chunk(|chunk: &Bytes, latency: Duration, _span: &tracing::Span| {
                    tracing::trace!(size_bytes = chunk.len(), latency = ?latency, "sending body chunk")
                })
                .make_span_with(DefaultMakeSpan::new().include_headers(true).level(tracing::Level::INFO))
                .on_request(DefaultOnRequest::new())
                .on_response(DefaultOnResponse::new().include_headers(true).latency_unit(LatencyUnit::Micros)),
        )
        // Set a timeout.
        .layer(TimeoutLayer::with_status_code(StatusCode::REQUEST_TIMEOUT, Duration::from_secs(10)))
        // Remove senstive headers from trace.
        .layer(SetSensitiveHeadersLayer::new([header::AUTHORIZATION, header::COOKIE]))
        // Add CORS preflight support.
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
                .allow_headers(Any)
                .vary([header::AUTHORIZATION]),
        );

    let api_router = Router::new()
        // `GET /api/me` echoes validated claims.
        .route("/me", get(router::me::handler))
        .route_layer(AxumMiddleware::from_fn_with_state(
            state.clone(),
            middleware::authenticate,
        ));

    let mut routes = Router::new()
        // `GET /status.json` goes to `status`.
        .route("/status.json", get(router::status::status))
        .nest("/api", api_router);

    if state.config.token.issue_endpoint {
        // `POST /token` goes to `token`.
        routes = routes.route("/token", post(router::token::handler));
    }

    if let Some(handle) = state.metrics.clone() {
        routes = routes.route(
            "/metrics",
            get(move || std::future::ready(handle.render())),
        );
    }

    routes
        .with_state(state.clone())
        .nest("/.well-known", well_known::well_known(state))
        .route_layer(AxumMiddleware::from_fn(telemetry::track))
        .layer(middleware)
}

/// Initialize the application state.
pub async fn initialize_state(
    config: Arc<config::Configuration>,
    metrics: Option<PrometheusHandle>,
) -> Result<AppState, ServerError> {
    let policy = config.token.rejection_policy()?;

    // key generation is CPU bound.
    let source = config.token.key_source();
    let keys = tokio::task::spawn_blocking(move || KeyPair::load(&source))
        .await
        .map_err(|err| ServerError::Internal {
            details: "key loading task failed".into(),
            source: Some(Box::new(err)),
        })??;

    let options = config.token.options(&keys)?;
    let public_key = Arc::new(keys.public_key().clone());
    let token = TokenService::new(options, &public_key);

    tracing::info!(
        issuer = %config.token.issuer,
        audience = %config.token.audience,
        kid = token.options().credential.key_id(),
        "token service ready"
    );

    Ok(AppState {
        config,
        token,
        public_key,
        policy,
        metrics,
    })
}
