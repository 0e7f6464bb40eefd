//! Health endpoints.
//!
//! | Endpoint | Purpose |
//! |----------|---------|
//! | `GET /healthz` | Liveness — process is alive |
//! | `GET /readyz` | Readiness — repository reachable, accepting traffic |

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;

use super::{lock_or_recover, AppState};

/// Liveness probe: 200 if the process is serving HTTP. No dependencies checked.
pub(super) async fn handler_healthz() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

/// Readiness probe: reports the catalog size along with 200. The repository
/// is in-process, so readiness only fails if the state lock is unobtainable.
pub(super) async fn handler_readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let count = lock_or_recover(&state.repo).len();
    (
        StatusCode::OK,
        Json(serde_json::json!({ "status": "ok", "experiments": count })),
    )
}
