//! Event bus and notification endpoints.

use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;

use super::AppState;

pub(super) async fn handler_notifications(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let notifications = state.event_bus.notifications();
    Json(serde_json::json!({ "notifications": notifications }))
}

pub(super) async fn handler_events(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let events = state.event_bus.recent();
    Json(serde_json::json!({ "events": events }))
}
