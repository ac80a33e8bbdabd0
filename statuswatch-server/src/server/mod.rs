mod config;

use std::sync::Arc;

use axum::http::{HeaderName, HeaderValue};
use axum::middleware;
use axum::response::Response as AxumResponse;
use axum::{Json, Router, extract::State, http::header, routing::get};
pub use config::{AppConfig, ConfigError};
use statuswatch_shared::api::{self, HealthDto};
use statuswatch_shared::Snapshot;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::info_span;
use uuid::Uuid;

use crate::source::DemoSource;

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    source: Arc<Mutex<DemoSource>>,
    shutdown: CancellationToken,
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        let source = DemoSource::new(config.shape(), config.seed);
        Self {
            config,
            source: Arc::new(Mutex::new(source)),
            shutdown: CancellationToken::new(),
        }
    }

    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    pub async fn requests_served(&self) -> u64 {
        self.source.lock().await.requests()
    }
}

#[derive(Clone, Debug)]
struct ReqId(pub String);

pub fn router(state: AppState) -> Router {
    let trace = TraceLayer::new_for_http().make_span_with(|req: &axum::http::Request<_>| {
        let request_id = req
            .extensions()
            .get::<ReqId>()
            .map(|r| r.0.clone())
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        info_span!(
            "request",
            method = %req.method(),
            path = %req.uri().path(),
            request_id = %request_id,
        )
    });

    Router::new()
        .route(api::HEALTH_PATH, get(health))
        .route(api::DATA_PATH, get(api_data))
        .with_state(state)
        .layer(trace)
        .layer(middleware::from_fn(add_response_headers))
        .layer(middleware::from_fn(add_request_id))
}

async fn health() -> Json<HealthDto> {
    Json(HealthDto {
        status: "ok".into(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

async fn api_data(State(state): State<AppState>) -> Json<Snapshot> {
    let mut source = state.source.lock().await;
    let listing = source.next_listing();
    tracing::debug!(
        request = source.requests(),
        records = listing.len(),
        "serving listing"
    );
    Json(listing)
}

async fn add_request_id(
    mut req: axum::http::Request<axum::body::Body>,
    next: axum::middleware::Next,
) -> AxumResponse {
    let hdr = HeaderName::from_static("x-request-id");
    let rid = req
        .headers()
        .get(&hdr)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    req.extensions_mut().insert(ReqId(rid.clone()));
    let mut resp = next.run(req).await;
    if let Ok(hv) = HeaderValue::from_str(&rid) {
        resp.headers_mut().insert(hdr, hv);
    }
    resp
}

async fn add_response_headers(
    req: axum::http::Request<axum::body::Body>,
    next: axum::middleware::Next,
) -> AxumResponse {
    let mut resp = next.run(req).await;
    let headers = resp.headers_mut();
    // Browser dashboards on other origins poll this directly
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("no-store, no-cache, must-revalidate, private"),
    );
    resp
}
