//! HTTP front end for the triage service.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/` | Service banner |
//! | `GET`  | `/health` | `healthy` or `degraded`, with uptime and request totals |
//! | `POST` | `/execute` | Supervisor handshake request → handshake response |
//! | `GET`  | `/metrics` | Metrics snapshot |
//!
//! `POST /execute` answers 200 for every well-formed JSON body; triage
//! failures travel inside the handshake response as `status: "failed"`.
//! Bodies that are not JSON get the error envelope:
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "..." } }
//! ```
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted so browser dashboards can
//! poll `/health` and `/metrics`.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use bug_triage_core::handshake::{HandshakeResponse, AGENT_NAME};
use bug_triage_core::TriageService;

use crate::config::Config;
use crate::metrics::{MetricsCollector, MetricsSnapshot, Totals};
use crate::sqlite_store;

/// Shared state handed to every route handler.
#[derive(Clone)]
pub struct AppState {
    service: Arc<TriageService>,
    metrics: Arc<MetricsCollector>,
}

impl AppState {
    /// Wires `metrics` in as the service's observer.
    pub fn new(service: TriageService, metrics: Arc<MetricsCollector>) -> Self {
        let service = service.with_observer(metrics.clone());
        Self {
            service: Arc::new(service),
            metrics,
        }
    }

    /// Opens the configured store and builds the service around it.
    pub async fn from_config(config: &Config) -> anyhow::Result<Self> {
        let store = sqlite_store::open(config).await?;
        let service = TriageService::new(store)?;
        Ok(Self::new(service, Arc::new(MetricsCollector::new())))
    }
}

/// Builds the router. Split from [`run_server`] so tests can serve it on
/// their own listener.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(handle_root))
        .route("/health", get(handle_health))
        .route("/execute", post(handle_execute))
        .route("/metrics", get(handle_metrics))
        .layer(cors)
        .with_state(state)
}

/// Starts the server on `[server].bind` and runs until the process exits.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let state = AppState::from_config(config).await?;
    let app = router(state);

    let bind_addr = config.server.bind.clone();
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("listening on http://{}", bind_addr);
    println!("Triage server listening on http://{}", bind_addr);

    axum::serve(listener, app).await?;
    Ok(())
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request".to_string(),
        message: message.into(),
    }
}

// ============ GET / ============

#[derive(Serialize)]
struct Banner {
    message: String,
    agent_name: String,
    version: String,
}

async fn handle_root() -> Json<Banner> {
    Json(Banner {
        message: "Bug Triage Service".to_string(),
        agent_name: AGENT_NAME.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    /// `healthy`, or `degraded` when the store does not answer.
    status: String,
    agent_name: String,
    version: String,
    timestamp: String,
    details: HealthDetails,
}

#[derive(Serialize)]
struct HealthDetails {
    /// `connected`, `disconnected`, or `disabled`.
    database: String,
    uptime_seconds: f64,
    totals: Totals,
}

async fn handle_health(State(state): State<AppState>) -> Json<HealthResponse> {
    let (status, database) = match state.service.store_healthy().await {
        Some(true) => ("healthy", "connected"),
        Some(false) => ("degraded", "disconnected"),
        None => ("healthy", "disabled"),
    };
    state.metrics.record_health_check(status);

    Json(HealthResponse {
        status: status.to_string(),
        agent_name: AGENT_NAME.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        details: HealthDetails {
            database: database.to_string(),
            uptime_seconds: state.metrics.uptime_seconds(),
            totals: state.metrics.snapshot().totals,
        },
    })
}

// ============ POST /execute ============

async fn handle_execute(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<HandshakeResponse>, AppError> {
    let Json(request) = body.map_err(|e| bad_request(e.body_text()))?;
    Ok(Json(state.service.process(&request).await))
}

// ============ GET /metrics ============

async fn handle_metrics(State(state): State<AppState>) -> Json<MetricsSnapshot> {
    Json(state.metrics.snapshot())
}
