//! Experiment resource API — CRUD, updates, pledges, data upload, funding.

use std::sync::Arc;

use axum::extract::{Multipart, Path as AxumPath, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use sha2::{Digest, Sha256};

use super::{lock_or_recover, AppState};
use crate::catalog::config::{ExperimentInput, ExperimentPatch};
use crate::catalog::funding;
use crate::catalog::pricing;
use crate::catalog::types::{DataFile, Update};
use crate::error::CatalogError;
use crate::events::Event;

/// Map a core error onto an HTTP response with a JSON error body. The body
/// text is what remote clients re-surface as their error message.
fn error_response(err: CatalogError) -> Response {
    let status = match &err {
        CatalogError::Validation { .. } | CatalogError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        CatalogError::NotFound(_) => StatusCode::NOT_FOUND,
        CatalogError::Conflict(_) | CatalogError::AlreadyPending { .. } => StatusCode::CONFLICT,
        CatalogError::WalletRejected(_) | CatalogError::SettlementFailed(_) => {
            StatusCode::BAD_GATEWAY
        }
    };
    let mut body = serde_json::json!({ "error": err.to_string() });
    if let CatalogError::Validation { fields } = &err {
        body["fields"] = serde_json::json!(fields);
    }
    (status, Json(body)).into_response()
}

/// GET /experiments — all campaigns in insertion order.
pub(super) async fn handler_experiments_list(
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let repo = lock_or_recover(&state.repo);
    Json(serde_json::json!(repo.list())).into_response()
}

/// POST /experiments — create a campaign from a typed JSON body.
pub(super) async fn handler_experiments_create(
    State(state): State<Arc<AppState>>,
    Json(input): Json<ExperimentInput>,
) -> impl IntoResponse {
    let mut repo = lock_or_recover(&state.repo);
    match repo.create(input) {
        Ok(experiment) => (StatusCode::CREATED, Json(serde_json::json!(experiment))).into_response(),
        Err(e) => error_response(e),
    }
}

/// GET /experiments/{id}
pub(super) async fn handler_experiment_get(
    State(state): State<Arc<AppState>>,
    AxumPath(id): AxumPath<String>,
) -> impl IntoResponse {
    let repo = lock_or_recover(&state.repo);
    match repo.get(&id) {
        Ok(experiment) => Json(serde_json::json!(experiment)).into_response(),
        Err(e) => error_response(e),
    }
}

/// PUT /experiments/{id} — partial update of presentation fields.
pub(super) async fn handler_experiment_update(
    State(state): State<Arc<AppState>>,
    AxumPath(id): AxumPath<String>,
    Json(patch): Json<ExperimentPatch>,
) -> impl IntoResponse {
    let mut repo = lock_or_recover(&state.repo);
    match repo.patch(&id, patch) {
        Ok(experiment) => Json(serde_json::json!(experiment)).into_response(),
        Err(e) => error_response(e),
    }
}

#[derive(Deserialize)]
pub(super) struct UpdatePayload {
    date: Option<chrono::NaiveDate>,
    title: String,
    #[serde(default)]
    content: String,
}

/// POST /experiments/{id}/updates — append a progress update.
pub(super) async fn handler_experiment_post_update(
    State(state): State<Arc<AppState>>,
    AxumPath(id): AxumPath<String>,
    Json(payload): Json<UpdatePayload>,
) -> impl IntoResponse {
    if payload.title.trim().is_empty() {
        return error_response(CatalogError::validation(["title"]));
    }
    let update = Update {
        date: payload.date.unwrap_or_else(|| Utc::now().date_naive()),
        title: payload.title,
        content: payload.content,
    };
    let mut repo = lock_or_recover(&state.repo);
    match repo.append_update(&id, update.clone()) {
        Ok(experiment) => {
            state.event_bus.emit(Event::UpdatePosted {
                experiment_id: id,
                title: update.title,
            });
            Json(serde_json::json!(experiment)).into_response()
        }
        Err(e) => error_response(e),
    }
}

#[derive(Deserialize)]
pub(super) struct PledgePayload {
    amount: f64,
    tier_index: Option<usize>,
}

/// POST /experiments/{id}/pledges — record a backer's pledge.
pub(super) async fn handler_experiment_pledge(
    State(state): State<Arc<AppState>>,
    AxumPath(id): AxumPath<String>,
    Json(payload): Json<PledgePayload>,
) -> impl IntoResponse {
    let mut repo = lock_or_recover(&state.repo);
    match repo.record_pledge(&id, payload.amount, payload.tier_index) {
        Ok(experiment) => {
            let tier = payload
                .tier_index
                .and_then(|i| experiment.support_tiers.get(i))
                .map(|t| t.title.clone());
            state.event_bus.emit(Event::PledgeRecorded {
                experiment_id: id,
                amount: payload.amount,
                tier,
            });
            Json(serde_json::json!(experiment)).into_response()
        }
        Err(e) => error_response(e),
    }
}

/// GET /experiments/{id}/funding — progress sidebar payload.
pub(super) async fn handler_experiment_funding(
    State(state): State<Arc<AppState>>,
    AxumPath(id): AxumPath<String>,
) -> impl IntoResponse {
    let repo = lock_or_recover(&state.repo);
    match repo.get(&id) {
        Ok(experiment) => Json(serde_json::json!(funding::summary(experiment))).into_response(),
        Err(e) => error_response(e),
    }
}

#[derive(Deserialize)]
pub(super) struct QuoteQuery {
    months: Option<u32>,
}

/// GET /experiments/{id}/quote?months=N — price timed access.
pub(super) async fn handler_experiment_quote(
    State(state): State<Arc<AppState>>,
    AxumPath(id): AxumPath<String>,
    Query(query): Query<QuoteQuery>,
) -> impl IntoResponse {
    let months = query.months.unwrap_or(0);
    let repo = lock_or_recover(&state.repo);
    let experiment = match repo.get(&id) {
        Ok(e) => e,
        Err(e) => return error_response(e),
    };
    match pricing::price(experiment, months) {
        Ok(price) => Json(serde_json::json!({
            "experiment_id": id,
            "months": months,
            "price": price,
        }))
        .into_response(),
        Err(e) => error_response(e),
    }
}

/// POST /experiments/{id}/data — multipart upload of a research artifact.
///
/// The `file` part carries the bytes; optional `name` and `description`
/// text parts override metadata. The stored content hash is the sha256 of
/// the uploaded bytes.
pub(super) async fn handler_experiment_upload_data(
    State(state): State<Arc<AppState>>,
    AxumPath(id): AxumPath<String>,
    mut multipart: Multipart,
) -> impl IntoResponse {
    let mut file_name = String::new();
    let mut description = String::new();
    let mut bytes: Option<Vec<u8>> = None;

    while let Some(field) = match multipart.next_field().await {
        Ok(f) => f,
        Err(e) => return error_response(CatalogError::InvalidInput(e.to_string())),
    } {
        match field.name().unwrap_or_default() {
            "file" => {
                if let Some(fname) = field.file_name() {
                    if file_name.is_empty() {
                        file_name = fname.to_string();
                    }
                }
                match field.bytes().await {
                    Ok(b) => bytes = Some(b.to_vec()),
                    Err(e) => return error_response(CatalogError::InvalidInput(e.to_string())),
                }
            }
            "name" => file_name = field.text().await.unwrap_or_default(),
            "description" => description = field.text().await.unwrap_or_default(),
            other => {
                state.event_bus.emit(Event::Warning {
                    context: "upload".into(),
                    message: format!("ignoring unknown multipart field '{}'", other),
                });
            }
        }
    }

    let bytes = match bytes {
        Some(b) if !b.is_empty() => b,
        _ => return error_response(CatalogError::validation(["file"])),
    };
    if file_name.trim().is_empty() {
        return error_response(CatalogError::validation(["name"]));
    }

    let hash = format!("{:x}", Sha256::digest(&bytes));
    let file = DataFile {
        name: file_name,
        description,
        size: human_size(bytes.len()),
        date: Utc::now().date_naive(),
        hash: hash.clone(),
    };

    let mut repo = lock_or_recover(&state.repo);
    match repo.attach_data_file(&id, file.clone()) {
        Ok(_) => {
            state.event_bus.emit(Event::DataFileAdded {
                experiment_id: id,
                name: file.name.clone(),
                hash,
            });
            (StatusCode::CREATED, Json(serde_json::json!(file))).into_response()
        }
        Err(e) => error_response(e),
    }
}

/// Human-readable size string for the informational `size` field.
fn human_size(len: usize) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = 1024.0 * 1024.0;
    const GB: f64 = 1024.0 * 1024.0 * 1024.0;
    let len = len as f64;
    if len >= GB {
        format!("{:.1} GB", len / GB)
    } else if len >= MB {
        format!("{:.1} MB", len / MB)
    } else if len >= KB {
        format!("{:.1} KB", len / KB)
    } else {
        format!("{} B", len as usize)
    }
}
