use axum::extract::State;
use axum::http::StatusCode;
use axum::{routing::get, Json, Router};
use lineage_db::repositories::MemberRepo;
use serde::Serialize;

use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    /// `ok`, or `degraded` when the member table cannot be read.
    pub status: &'static str,
    pub version: &'static str,
    pub db_healthy: bool,
    /// Stored family members; absent when the database is unreachable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub members: Option<i64>,
}

/// GET /health
///
/// Checks the database by counting members. A failed count answers 503.
async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let members = match MemberRepo::count(&state.pool).await {
        Ok(count) => Some(count),
        Err(e) => {
            tracing::warn!(error = %e, "Health check could not read members");
            None
        }
    };
    let db_healthy = members.is_some();

    let (code, status) = if db_healthy {
        (StatusCode::OK, "ok")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "degraded")
    };

    (
        code,
        Json(HealthResponse {
            status,
            version: env!("CARGO_PKG_VERSION"),
            db_healthy,
            members,
        }),
    )
}

/// `/health` sits at the root, outside `/api`.
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health))
}
