//! # REST API for Students
//!
//! Bulk creation from a block of names, single-student edits and deletes.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use shared::{BulkAddStudentsRequest, DeleteResponse, EditStudentRequest};
use tracing::info;

use crate::domain::commands::roster::{BulkAddStudentsCommand, EditStudentCommand};
use crate::io::rest::domain_error_response;
use crate::AppState;

pub async fn list_students(State(state): State<AppState>) -> impl IntoResponse {
    info!("GET /api/students");

    match state.roster_service.list_students().await {
        Ok(students) => (StatusCode::OK, Json(students)).into_response(),
        Err(e) => domain_error_response("Failed to list students", e),
    }
}

pub async fn bulk_add_students(
    State(state): State<AppState>,
    Json(request): Json<BulkAddStudentsRequest>,
) -> impl IntoResponse {
    info!("POST /api/students/bulk - stop: {}", request.stop_id);

    let command = BulkAddStudentsCommand {
        stop_id: request.stop_id,
        names_input: request.names,
    };

    match state.roster_service.bulk_add_students(command).await {
        Ok(students) => (StatusCode::CREATED, Json(students)).into_response(),
        Err(e) => domain_error_response("Failed to add students", e),
    }
}

pub async fn edit_student(
    State(state): State<AppState>,
    Path(student_id): Path<String>,
    Json(request): Json<EditStudentRequest>,
) -> impl IntoResponse {
    // Guardian contact details stay out of the log
    info!("PUT /api/students/{}", student_id);

    let command = EditStudentCommand {
        student_id,
        stop_id: request.stop_id,
        name: request.name,
        active: request.active,
        guardian_name: request.guardian_name,
        contact: request.contact,
    };

    match state.roster_service.edit_student(command).await {
        Ok(student) => (StatusCode::OK, Json(student)).into_response(),
        Err(e) => domain_error_response("Failed to edit student", e),
    }
}

pub async fn delete_student(
    State(state): State<AppState>,
    Path(student_id): Path<String>,
) -> impl IntoResponse {
    info!("DELETE /api/students/{}", student_id);

    match state.roster_service.delete_student(&student_id).await {
        Ok(deleted) => (StatusCode::OK, Json(DeleteResponse { deleted })).into_response(),
        Err(e) => domain_error_response("Failed to delete student", e),
    }
}
