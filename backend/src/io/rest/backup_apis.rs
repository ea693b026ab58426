//! # REST API for Backups
//!
//! Only one backup runs at a time; a request that arrives while another is
//! in flight gets `409 Conflict`.

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use shared::{BackupReport, BackupRequest};
use tracing::{error, info, warn};

use crate::io::rest::error_response;
use crate::AppState;

/// 207 when exactly one leg failed, 500 when no copy was saved anywhere
fn report_status(report: &BackupReport) -> StatusCode {
    if report.is_partial() {
        StatusCode::MULTI_STATUS
    } else if report.is_success() {
        StatusCode::OK
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    }
}

/// An empty body means a local-only backup; anything else must be a valid request
fn parse_request(body: &[u8]) -> Result<BackupRequest, serde_json::Error> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(BackupRequest::default());
    }
    serde_json::from_slice(body)
}

/// Local copy plus, when a credential is supplied, a remote upload
pub async fn run_backup(State(state): State<AppState>, body: Bytes) -> impl IntoResponse {
    let request = match parse_request(&body) {
        Ok(request) => request,
        Err(e) => {
            warn!("POST /api/backup - invalid body: {}", e);
            return error_response(StatusCode::BAD_REQUEST, format!("invalid backup request: {}", e));
        }
    };
    info!("POST /api/backup - remote: {}", request.credential.is_some());

    let _guard = match state.backup_guard.try_lock() {
        Ok(guard) => guard,
        Err(_) => {
            warn!("Backup requested while another is running");
            return error_response(StatusCode::CONFLICT, "a backup is already running");
        }
    };

    match state
        .backup_service
        .perform_backup(request.credential.as_deref())
        .await
    {
        Ok(report) => (report_status(&report), Json(report)).into_response(),
        Err(e) => {
            error!("Backup failed before delivery: {:?}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::backup::{BackupError, RemoteBackupStore};
    use crate::io::rest::test_support::{send_json, test_app};
    use async_trait::async_trait;
    use chrono::Utc;
    use serde_json::json;
    use shared::{LocalOutcome, RemoteOutcome, SnapshotSummary};
    use std::sync::Arc;

    struct RejectingStore;

    #[async_trait]
    impl RemoteBackupStore for RejectingStore {
        async fn upload(&self, _credential: &str, _file_name: &str, _content: &str) -> Result<String, BackupError> {
            Err(BackupError::RemoteUpload {
                status: Some(401),
                message: "Invalid Credentials".to_string(),
            })
        }
    }

    #[tokio::test]
    async fn test_local_only_backup_is_ok() {
        let (router, _, dir) = test_app(Arc::new(RejectingStore)).await;

        let (code, report) = send_json(&router, "POST", "/api/backup", None).await;
        assert_eq!(code, StatusCode::OK);
        assert_eq!(report["local"]["status"], "saved");
        assert_eq!(report["remote"]["status"], "skipped");
        assert!(dir.path().join("backups").read_dir().unwrap().next().is_some());
    }

    #[tokio::test]
    async fn test_remote_failure_is_multi_status() {
        let (router, _, _dir) = test_app(Arc::new(RejectingStore)).await;

        let (code, report) = send_json(
            &router,
            "POST",
            "/api/backup",
            Some(json!({ "credential": "expired" })),
        )
        .await;
        assert_eq!(code, StatusCode::MULTI_STATUS);
        assert_eq!(report["remote"]["status"], "failed");
        assert_eq!(report["remote"]["http_status"], 401);
        assert_eq!(report["remote"]["message"], "Invalid Credentials");
    }

    #[tokio::test]
    async fn test_invalid_body_is_bad_request() {
        let (router, _, dir) = test_app(Arc::new(RejectingStore)).await;

        let (code, body) = send_json(&router, "POST", "/api/backup", Some(json!({ "credential": 5 }))).await;
        assert_eq!(code, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().starts_with("invalid backup request"));
        assert!(!dir.path().join("backups").exists());
    }

    #[test]
    fn test_parse_request() {
        assert_eq!(parse_request(b"").unwrap().credential, None);
        assert_eq!(parse_request(b" \n").unwrap().credential, None);
        assert_eq!(parse_request(br#"{}"#).unwrap().credential, None);
        assert_eq!(
            parse_request(br#"{"credential":"tok"}"#).unwrap().credential.as_deref(),
            Some("tok")
        );
        assert!(parse_request(b"{not json").is_err());
    }

    #[tokio::test]
    async fn test_concurrent_backup_is_rejected() {
        let (router, state, _dir) = test_app(Arc::new(RejectingStore)).await;

        let _held = state.backup_guard.try_lock().unwrap();
        let (code, body) = send_json(&router, "POST", "/api/backup", None).await;
        assert_eq!(code, StatusCode::CONFLICT);
        assert_eq!(body["error"], "a backup is already running");
    }

    #[test]
    fn test_report_status_mapping() {
        let report = |local, remote| BackupReport {
            generated_at: Utc::now(),
            summary: SnapshotSummary::default(),
            local,
            remote,
        };
        let saved = || LocalOutcome::Saved { path: "b.json".to_string() };
        let failed = || LocalOutcome::Failed { message: "disk full".to_string() };

        assert_eq!(
            report_status(&report(saved(), RemoteOutcome::Uploaded { file_id: "f".to_string() })),
            StatusCode::OK
        );
        assert_eq!(
            report_status(&report(failed(), RemoteOutcome::Uploaded { file_id: "f".to_string() })),
            StatusCode::MULTI_STATUS
        );
        assert_eq!(
            report_status(&report(failed(), RemoteOutcome::Skipped { reason: "none".to_string() })),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
