//! # REST API for Stops

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use shared::{BulkAddStopsRequest, DeleteResponse, EditStopRequest};
use tracing::info;

use crate::domain::commands::roster::{BulkAddStopsCommand, EditStopCommand};
use crate::io::rest::domain_error_response;
use crate::AppState;

pub async fn list_stops(State(state): State<AppState>) -> impl IntoResponse {
    info!("GET /api/stops");

    match state.roster_service.list_stops().await {
        Ok(stops) => (StatusCode::OK, Json(stops)).into_response(),
        Err(e) => domain_error_response("Failed to list stops", e),
    }
}

/// Create one stop per newline- or comma-separated name
pub async fn bulk_add_stops(
    State(state): State<AppState>,
    Json(request): Json<BulkAddStopsRequest>,
) -> impl IntoResponse {
    info!("POST /api/stops/bulk - route: {}", request.route_id);

    let command = BulkAddStopsCommand {
        route_id: request.route_id,
        names_input: request.names,
    };

    match state.roster_service.bulk_add_stops(command).await {
        Ok(stops) => (StatusCode::CREATED, Json(stops)).into_response(),
        Err(e) => domain_error_response("Failed to add stops", e),
    }
}

pub async fn edit_stop(
    State(state): State<AppState>,
    Path(stop_id): Path<String>,
    Json(request): Json<EditStopRequest>,
) -> impl IntoResponse {
    info!("PUT /api/stops/{} - request: {:?}", stop_id, request);

    let command = EditStopCommand {
        stop_id,
        route_id: request.route_id,
        name: request.name,
    };

    match state.roster_service.edit_stop(command).await {
        Ok(stop) => (StatusCode::OK, Json(stop)).into_response(),
        Err(e) => domain_error_response("Failed to edit stop", e),
    }
}

pub async fn delete_stop(
    State(state): State<AppState>,
    Path(stop_id): Path<String>,
) -> impl IntoResponse {
    info!("DELETE /api/stops/{}", stop_id);

    match state.roster_service.delete_stop(&stop_id).await {
        Ok(deleted) => (StatusCode::OK, Json(DeleteResponse { deleted })).into_response(),
        Err(e) => domain_error_response("Failed to delete stop", e),
    }
}
