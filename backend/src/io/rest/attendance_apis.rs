//! # REST API for Daily Attendance

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use chrono::Local;
use serde::Deserialize;
use shared::{DeleteResponse, MarkAttendanceRequest};
use tracing::info;

use crate::domain::commands::attendance::MarkAttendanceCommand;
use crate::io::rest::{domain_error_response, parse_date, require_date};
use crate::AppState;

#[derive(Deserialize, Debug)]
pub struct DateQuery {
    pub date: Option<String>,
}

/// All attendance records, or those of `?date=YYYY-MM-DD`
pub async fn list_attendance(
    State(state): State<AppState>,
    Query(query): Query<DateQuery>,
) -> impl IntoResponse {
    info!("GET /api/attendance - query: {:?}", query);

    let date = match query.date.as_deref().map(parse_date).transpose() {
        Ok(date) => date,
        Err(response) => return response,
    };

    match state.attendance_service.list_attendance(date).await {
        Ok(records) => (StatusCode::OK, Json(records)).into_response(),
        Err(e) => domain_error_response("Failed to list attendance", e),
    }
}

/// Mark a student for a day (today when no date is given)
pub async fn mark_attendance(
    State(state): State<AppState>,
    Json(request): Json<MarkAttendanceRequest>,
) -> impl IntoResponse {
    info!("POST /api/attendance - request: {:?}", request);

    let command = MarkAttendanceCommand {
        student_id: request.student_id,
        date: request.date.unwrap_or_else(|| Local::now().date_naive()),
        status: request.status,
    };

    match state.attendance_service.mark_attendance(command).await {
        Ok(record) => (StatusCode::OK, Json(record)).into_response(),
        Err(e) => domain_error_response("Failed to mark attendance", e),
    }
}

pub async fn delete_attendance(
    State(state): State<AppState>,
    Path(record_id): Path<String>,
) -> impl IntoResponse {
    info!("DELETE /api/attendance/{}", record_id);

    match state.attendance_service.delete_attendance(&record_id).await {
        Ok(deleted) => (StatusCode::OK, Json(DeleteResponse { deleted })).into_response(),
        Err(e) => domain_error_response("Failed to delete attendance", e),
    }
}

pub async fn daily_summary(
    State(state): State<AppState>,
    Query(query): Query<DateQuery>,
) -> impl IntoResponse {
    info!("GET /api/attendance/summary - query: {:?}", query);

    let date = match require_date(query.date.as_deref()) {
        Ok(date) => date,
        Err(response) => return response,
    };

    match state.attendance_service.daily_summary(date).await {
        Ok(summary) => (StatusCode::OK, Json(summary)).into_response(),
        Err(e) => domain_error_response("Failed to compute daily summary", e),
    }
}

/// Route-grouped roster with each student's status for the day
pub async fn daily_roster(
    State(state): State<AppState>,
    Query(query): Query<DateQuery>,
) -> impl IntoResponse {
    info!("GET /api/attendance/roster - query: {:?}", query);

    let date = match require_date(query.date.as_deref()) {
        Ok(date) => date,
        Err(response) => return response,
    };

    match state.attendance_service.daily_roster(date).await {
        Ok(groups) => (StatusCode::OK, Json(groups)).into_response(),
        Err(e) => domain_error_response("Failed to build daily roster", e),
    }
}

pub async fn student_history(
    State(state): State<AppState>,
    Path(student_id): Path<String>,
) -> impl IntoResponse {
    info!("GET /api/students/{}/attendance", student_id);

    match state.attendance_service.student_history(&student_id).await {
        Ok(records) => (StatusCode::OK, Json(records)).into_response(),
        Err(e) => domain_error_response("Failed to load attendance history", e),
    }
}
