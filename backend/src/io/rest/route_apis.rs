//! # REST API for Routes
//!
//! Endpoints for listing, saving and deleting routes, and for reading the
//! ordered stops of one route.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use shared::{DeleteResponse, SaveRouteRequest};
use tracing::info;

use crate::domain::commands::roster::SaveRouteCommand;
use crate::io::rest::domain_error_response;
use crate::AppState;

/// List all routes in insertion order
pub async fn list_routes(State(state): State<AppState>) -> impl IntoResponse {
    info!("GET /api/routes");

    match state.roster_service.list_routes().await {
        Ok(routes) => (StatusCode::OK, Json(routes)).into_response(),
        Err(e) => domain_error_response("Failed to list routes", e),
    }
}

/// Create a route, or rename an existing one when `id` is given
pub async fn save_route(
    State(state): State<AppState>,
    Json(request): Json<SaveRouteRequest>,
) -> impl IntoResponse {
    info!("POST /api/routes - request: {:?}", request);

    let status = if request.id.is_some() {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };
    let command = SaveRouteCommand {
        id: request.id,
        name: request.name,
        description: request.description,
    };

    match state.roster_service.save_route(command).await {
        Ok(route) => (status, Json(route)).into_response(),
        Err(e) => domain_error_response("Failed to save route", e),
    }
}

pub async fn delete_route(
    State(state): State<AppState>,
    Path(route_id): Path<String>,
) -> impl IntoResponse {
    info!("DELETE /api/routes/{}", route_id);

    match state.roster_service.delete_route(&route_id).await {
        Ok(deleted) => (StatusCode::OK, Json(DeleteResponse { deleted })).into_response(),
        Err(e) => domain_error_response("Failed to delete route", e),
    }
}

/// Stops of one route by pickup order
pub async fn list_route_stops(
    State(state): State<AppState>,
    Path(route_id): Path<String>,
) -> impl IntoResponse {
    info!("GET /api/routes/{}/stops", route_id);

    match state.roster_service.stops_for_route(&route_id).await {
        Ok(stops) => (StatusCode::OK, Json(stops)).into_response(),
        Err(e) => domain_error_response("Failed to list route stops", e),
    }
}

#[cfg(test)]
mod tests {
    use crate::io::rest::test_support::{send_json, test_app};
    use crate::io::backup::DriveUploader;
    use axum::http::StatusCode;
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;

    fn unused_remote() -> Arc<DriveUploader> {
        Arc::new(DriveUploader::new("http://127.0.0.1:9/upload", Duration::from_secs(1)).unwrap())
    }

    #[tokio::test]
    async fn test_route_lifecycle() {
        let (router, _, _dir) = test_app(unused_remote()).await;

        let (status, created) =
            send_json(&router, "POST", "/api/routes", Some(json!({ "name": "North" }))).await;
        assert_eq!(status, StatusCode::CREATED);
        let id = created["id"].as_str().unwrap().to_string();

        let (status, renamed) = send_json(
            &router,
            "POST",
            "/api/routes",
            Some(json!({ "id": id, "name": "North Loop", "description": "Morning run" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(renamed["name"], "North Loop");

        let (_, routes) = send_json(&router, "GET", "/api/routes", None).await;
        assert_eq!(routes.as_array().unwrap().len(), 1);
        assert_eq!(routes[0]["description"], "Morning run");

        let (status, body) = send_json(&router, "DELETE", &format!("/api/routes/{}", id), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "deleted": true }));

        let (_, body) = send_json(&router, "DELETE", &format!("/api/routes/{}", id), None).await;
        assert_eq!(body, json!({ "deleted": false }));
    }

    #[tokio::test]
    async fn test_route_stops_are_ordered() {
        let (router, _, _dir) = test_app(unused_remote()).await;

        send_json(
            &router,
            "POST",
            "/api/stops/bulk",
            Some(json!({ "routeId": "r1", "names": "First\nSecond, Third" })),
        )
        .await;

        let (status, stops) = send_json(&router, "GET", "/api/routes/r1/stops", None).await;
        assert_eq!(status, StatusCode::OK);
        let names: Vec<&str> = stops
            .as_array()
            .unwrap()
            .iter()
            .map(|s| s["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["First", "Second", "Third"]);
    }
}
