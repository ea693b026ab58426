//! # REST API for Snapshot Export and Restore
//!
//! `GET /api/snapshot` downloads the whole store as one JSON document.
//! `POST /api/snapshot/restore` replaces the whole store with such a
//! document; the body is taken as raw text so a malformed document yields a
//! 400 with the parser message instead of an extractor rejection. The body
//! limit comes from `AppConfig::max_restore_bytes`; a larger upload gets a
//! 413 in the usual error shape.

use axum::{
    extract::{rejection::StringRejection, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
};
use shared::RestoreResponse;
use tracing::{error, info, warn};

use crate::domain::SnapshotError;
use crate::io::rest::error_response;
use crate::AppState;

fn snapshot_error_response(context: &str, e: SnapshotError) -> Response {
    match e {
        SnapshotError::Malformed(_) => error_response(StatusCode::BAD_REQUEST, e.to_string()),
        other => {
            error!("{}: {:?}", context, other);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, other.to_string())
        }
    }
}

pub async fn export_snapshot(State(state): State<AppState>) -> impl IntoResponse {
    info!("GET /api/snapshot");

    match state.snapshot_service.export_json().await {
        Ok((_, json)) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "application/json")],
            json,
        )
            .into_response(),
        Err(e) => snapshot_error_response("Failed to export snapshot", e),
    }
}

pub async fn restore_snapshot(
    State(state): State<AppState>,
    body: Result<String, StringRejection>,
) -> impl IntoResponse {
    let body = match body {
        Ok(body) => body,
        Err(rejection) => {
            warn!("POST /api/snapshot/restore - rejected: {}", rejection.body_text());
            return error_response(rejection.status(), rejection.body_text());
        }
    };
    info!("POST /api/snapshot/restore - {} bytes", body.len());

    match state.snapshot_service.restore_from_json(&body).await {
        Ok((snapshot, restored)) => (
            StatusCode::OK,
            Json(RestoreResponse {
                restored,
                generated_at: snapshot.generated_at,
            }),
        )
            .into_response(),
        Err(e) => snapshot_error_response("Failed to restore snapshot", e),
    }
}
