//! # API — Catalog REST Server
//!
//! Runs an Axum HTTP server exposing the campaign repository over the
//! `/experiments` resource boundary the frontend consumes, plus event-bus
//! notification endpoints and health probes.
//!
//! All mutation routes go through one mutex around the repository, which
//! provides the per-experiment write serialization the core documents but
//! does not itself enforce.

mod routes_experiments;
mod routes_health;
mod routes_notifications;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use anyhow::Result;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::Router;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::catalog::CampaignRepository;
use crate::events;

/// Uploads are capped well below anything decentralized storage would balk at.
const MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

/// Lock a mutex, recovering from poisoning.
pub(super) fn lock_or_recover<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

pub struct AppState {
    pub repo: Mutex<CampaignRepository>,
    pub event_bus: events::EventBus,
}

impl AppState {
    pub fn with_repo(repo: CampaignRepository) -> Arc<Self> {
        Arc::new(AppState {
            repo: Mutex::new(repo),
            event_bus: events::EventBus::new(),
        })
    }
}

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route(
            "/experiments",
            get(routes_experiments::handler_experiments_list)
                .post(routes_experiments::handler_experiments_create),
        )
        .route(
            "/experiments/{id}",
            get(routes_experiments::handler_experiment_get)
                .put(routes_experiments::handler_experiment_update),
        )
        .route(
            "/experiments/{id}/updates",
            post(routes_experiments::handler_experiment_post_update),
        )
        .route(
            "/experiments/{id}/pledges",
            post(routes_experiments::handler_experiment_pledge),
        )
        .route(
            "/experiments/{id}/data",
            post(routes_experiments::handler_experiment_upload_data),
        )
        .route(
            "/experiments/{id}/funding",
            get(routes_experiments::handler_experiment_funding),
        )
        .route(
            "/experiments/{id}/quote",
            get(routes_experiments::handler_experiment_quote),
        )
        .route(
            "/notifications",
            get(routes_notifications::handler_notifications),
        )
        .route("/events", get(routes_notifications::handler_events))
        .route("/healthz", get(routes_health::handler_healthz))
        .route("/readyz", get(routes_health::handler_readyz))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(CatchPanicLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(RequestBodyLimitLayer::new(MAX_UPLOAD_BYTES))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(30),
        ))
        .with_state(state)
}

pub async fn run(port: u16, repo: CampaignRepository) -> Result<()> {
    let state = AppState::with_repo(repo);
    let (tx, _) = tokio::sync::broadcast::channel::<String>(256);
    state.event_bus.set_sender(tx);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    info!(port, "descidata catalog API listening");
    axum::serve(listener, app).await?;
    Ok(())
}
