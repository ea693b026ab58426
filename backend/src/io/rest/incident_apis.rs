//! # REST API for Incidents

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use shared::{DeleteResponse, RecordIncidentRequest};
use tracing::info;

use crate::domain::commands::incidents::RecordIncidentCommand;
use crate::io::rest::domain_error_response;
use crate::AppState;

/// Incidents, newest first
pub async fn list_incidents(State(state): State<AppState>) -> impl IntoResponse {
    info!("GET /api/incidents");

    match state.incident_service.list_recent().await {
        Ok(incidents) => (StatusCode::OK, Json(incidents)).into_response(),
        Err(e) => domain_error_response("Failed to list incidents", e),
    }
}

pub async fn record_incident(
    State(state): State<AppState>,
    Json(request): Json<RecordIncidentRequest>,
) -> impl IntoResponse {
    info!("POST /api/incidents - student: {}", request.student_id);

    let command = RecordIncidentCommand {
        student_id: request.student_id,
        incident_type: request.incident_type,
        observation: request.observation,
    };

    match state.incident_service.record_incident(command).await {
        Ok(incident) => (StatusCode::CREATED, Json(incident)).into_response(),
        Err(e) => domain_error_response("Failed to record incident", e),
    }
}

pub async fn delete_incident(
    State(state): State<AppState>,
    Path(incident_id): Path<String>,
) -> impl IntoResponse {
    info!("DELETE /api/incidents/{}", incident_id);

    match state.incident_service.delete_incident(&incident_id).await {
        Ok(deleted) => (StatusCode::OK, Json(DeleteResponse { deleted })).into_response(),
        Err(e) => domain_error_response("Failed to delete incident", e),
    }
}

#[cfg(test)]
mod tests {
    use crate::io::backup::DriveUploader;
    use crate::io::rest::test_support::{send_json, test_app};
    use axum::http::StatusCode;
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn test_record_without_type_uses_default() {
        let remote = Arc::new(DriveUploader::new("http://127.0.0.1:9/upload", Duration::from_secs(1)).unwrap());
        let (router, _, _dir) = test_app(remote).await;

        let (code, incident) = send_json(
            &router,
            "POST",
            "/api/incidents",
            Some(json!({ "studentId": "s1", "observation": "Missed the bus" })),
        )
        .await;
        assert_eq!(code, StatusCode::CREATED);
        assert_eq!(incident["type"], "General");

        let (_, incidents) = send_json(&router, "GET", "/api/incidents", None).await;
        assert_eq!(incidents.as_array().unwrap().len(), 1);
    }
}
