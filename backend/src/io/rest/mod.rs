//! # REST API Interface Layer
//!
//! HTTP endpoints for the school transport records, all nested under `/api`.
//! Handlers translate between the DTOs of the `shared` crate and the domain
//! commands, log the request line, and map domain errors to status codes.
//! Every error body has the shape `{"error": "<message>"}`.

pub mod attendance_apis;
pub mod backup_apis;
pub mod incident_apis;
pub mod report_apis;
pub mod route_apis;
pub mod snapshot_apis;
pub mod stop_apis;
pub mod student_apis;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use chrono::NaiveDate;
use shared::{ErrorResponse, ReportMonth, ReportMonthError};
use tracing::error;

use crate::domain::SnapshotError;

pub(crate) fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
        .into_response()
}

/// Map a service error to a response: bad input is a 400, anything else a 500
pub(crate) fn domain_error_response(context: &str, e: anyhow::Error) -> Response {
    let bad_input = e.downcast_ref::<ReportMonthError>().is_some()
        || matches!(e.downcast_ref::<SnapshotError>(), Some(SnapshotError::Malformed(_)));

    if bad_input {
        error_response(StatusCode::BAD_REQUEST, e.to_string())
    } else {
        error!("{}: {:?}", context, e);
        error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    }
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, Response> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|_| {
        error_response(
            StatusCode::BAD_REQUEST,
            format!("invalid date '{}', expected YYYY-MM-DD", raw),
        )
    })
}

pub(crate) fn require_date(raw: Option<&str>) -> Result<NaiveDate, Response> {
    match raw {
        Some(raw) => parse_date(raw),
        None => Err(error_response(StatusCode::BAD_REQUEST, "missing 'date' query parameter")),
    }
}

pub(crate) fn require_month(raw: Option<&str>) -> Result<ReportMonth, Response> {
    let raw = raw.ok_or_else(|| {
        error_response(StatusCode::BAD_REQUEST, "missing 'month' query parameter")
    })?;
    raw.parse::<ReportMonth>()
        .map_err(|e| error_response(StatusCode::BAD_REQUEST, e.to_string()))
}
