//! # REST API for Monthly Reports

use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json},
};
use serde::Deserialize;
use tracing::info;

use crate::domain::ReportExporter;
use crate::io::rest::{domain_error_response, require_month};
use crate::AppState;

#[derive(Deserialize, Debug)]
pub struct MonthQuery {
    pub month: Option<String>,
}

/// Per-route, per-student statistics for `?month=YYYY-MM`
pub async fn monthly_report(
    State(state): State<AppState>,
    Query(query): Query<MonthQuery>,
) -> impl IntoResponse {
    info!("GET /api/reports/monthly - query: {:?}", query);

    let month = match require_month(query.month.as_deref()) {
        Ok(month) => month,
        Err(response) => return response,
    };

    match state.report_service.compute_monthly_report(month).await {
        Ok(report) => (StatusCode::OK, Json(report)).into_response(),
        Err(e) => domain_error_response("Failed to compute monthly report", e),
    }
}

/// The same report as a CSV download
pub async fn monthly_report_csv(
    State(state): State<AppState>,
    Query(query): Query<MonthQuery>,
) -> impl IntoResponse {
    info!("GET /api/reports/monthly/csv - query: {:?}", query);

    let month = match require_month(query.month.as_deref()) {
        Ok(month) => month,
        Err(response) => return response,
    };

    let export = match state
        .report_service
        .compute_monthly_report(month)
        .await
        .and_then(|report| ReportExporter::to_csv(&report))
    {
        Ok(export) => export,
        Err(e) => return domain_error_response("Failed to export monthly report", e),
    };

    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", export.filename),
            ),
        ],
        export.csv_content,
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use crate::io::backup::DriveUploader;
    use crate::io::rest::test_support::{send, send_json, test_app};
    use axum::http::StatusCode;
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn test_report_over_http() {
        let remote = Arc::new(DriveUploader::new("http://127.0.0.1:9/upload", Duration::from_secs(1)).unwrap());
        let (router, _, _dir) = test_app(remote).await;

        let (_, route) = send_json(&router, "POST", "/api/routes", Some(json!({ "name": "North" }))).await;
        let (_, stops) = send_json(
            &router,
            "POST",
            "/api/stops/bulk",
            Some(json!({ "routeId": route["id"], "names": "Main" })),
        )
        .await;
        let (_, students) = send_json(
            &router,
            "POST",
            "/api/students/bulk",
            Some(json!({ "stopId": stops[0]["id"], "names": "Ana" })),
        )
        .await;
        for (day, status) in [("2024-05-02", "PRESENT"), ("2024-05-03", "ABSENT")] {
            send_json(
                &router,
                "POST",
                "/api/attendance",
                Some(json!({ "studentId": students[0]["id"], "date": day, "status": status })),
            )
            .await;
        }

        let (code, report) = send_json(&router, "GET", "/api/reports/monthly?month=2024-05", None).await;
        assert_eq!(code, StatusCode::OK);
        assert_eq!(report["month"], "2024-05");
        let ana = &report["routes"][0]["students"][0];
        assert_eq!(ana["presentDays"], json!([2]));
        assert_eq!(ana["absentDays"], json!([3]));
        assert_eq!(ana["frequencyPercent"], 50.0);

        let (code, csv) = send(&router, "GET", "/api/reports/monthly/csv?month=2024-05", None).await;
        assert_eq!(code, StatusCode::OK);
        let csv = String::from_utf8(csv).unwrap();
        assert!(csv.contains("North,Ana,1,2,1,3,0,50%"));
    }

    #[tokio::test]
    async fn test_bad_month_is_rejected() {
        let remote = Arc::new(DriveUploader::new("http://127.0.0.1:9/upload", Duration::from_secs(1)).unwrap());
        let (router, _, _dir) = test_app(remote).await;

        let (code, body) = send_json(&router, "GET", "/api/reports/monthly?month=May", None).await;
        assert_eq!(code, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("YYYY-MM"));
    }
}
