use std::sync::OnceLock;
use std::time::Instant;

use axum::{Json, extract::State, http::StatusCode};
use chrono::Utc;
use tracing::instrument;

use crate::models::health::{EndpointGroups, HealthResponse, RootResponse};
use crate::state::AppState;

const VERSION: &str = env!("CARGO_PKG_VERSION");

static STARTED_AT: OnceLock<Instant> = OnceLock::new();

/// Pin the uptime origin. Called once at router construction.
pub fn mark_started() {
    STARTED_AT.get_or_init(Instant::now);
}

fn uptime_secs() -> u64 {
    STARTED_AT.get_or_init(Instant::now).elapsed().as_secs()
}

#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    operation_id = "health",
    summary = "Liveness and dependency status",
    responses(
        (status = 200, description = "Service healthy", body = HealthResponse),
        (status = 503, description = "Database unreachable", body = HealthResponse),
    ),
)]
#[instrument(skip(state))]
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let db_ok = match state.db.ping().await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(error = %e, "Database ping failed");
            false
        }
    };

    let status = if db_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(HealthResponse {
            status: if db_ok { "OK" } else { "ERROR" },
            uptime_secs: uptime_secs(),
            database: if db_ok { "connected" } else { "disconnected" },
            storage: state.media.backend_name(),
            environment: state.config.server.environment.clone(),
            version: VERSION,
            timestamp: Utc::now(),
        }),
    )
}

#[utoipa::path(
    get,
    path = "/",
    tag = "Health",
    operation_id = "root",
    summary = "Service banner",
    responses((status = 200, description = "Banner", body = RootResponse)),
)]
pub async fn root() -> Json<RootResponse> {
    Json(RootResponse {
        message: "Otogram API",
        version: VERSION,
        endpoints: EndpointGroups {
            auth: "/api/v1/auth",
            videos: "/api/v1/videos",
            users: "/api/v1/users",
            files: "/api/v1/files",
            health: "/health",
            docs: "/scalar",
        },
    })
}
