//! Remote delivery of a snapshot as a `multipart/related` upload.
//!
//! The request carries two JSON parts: file metadata first, then the
//! snapshot itself. The remote answers with a JSON body whose `id` names the
//! stored file, or with an `error.message` on failure.

use async_trait::async_trait;
use reqwest::{header, Client, StatusCode};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{info, warn};
use uuid::Uuid;

use super::BackupError;

pub const DEFAULT_UPLOAD_ENDPOINT: &str =
    "https://www.googleapis.com/upload/drive/v3/files?uploadType=multipart";

/// A blob store that accepts one snapshot file per call
#[async_trait]
pub trait RemoteBackupStore: Send + Sync {
    /// Upload `content` under `file_name`, returning the remote file id
    async fn upload(&self, credential: &str, file_name: &str, content: &str) -> Result<String, BackupError>;
}

#[derive(Debug, Clone)]
pub struct DriveUploader {
    client: Client,
    endpoint: String,
}

impl DriveUploader {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, BackupError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(BackupError::HttpClient)?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }
}

#[async_trait]
impl RemoteBackupStore for DriveUploader {
    async fn upload(&self, credential: &str, file_name: &str, content: &str) -> Result<String, BackupError> {
        let boundary = new_boundary();
        let metadata = json!({ "name": file_name, "mimeType": "application/json" });
        let body = multipart_body(&boundary, &metadata.to_string(), content);

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(credential)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/related; boundary={}", boundary),
            )
            .body(body)
            .send()
            .await
            .map_err(|e| BackupError::RemoteUpload {
                status: None,
                message: e.to_string(),
            })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| BackupError::RemoteUpload {
                status: Some(status.as_u16()),
                message: format!("failed to read upload response: {}", e),
            })?;

        if !status.is_success() {
            let message = remote_error_message(status, &text);
            warn!("Remote upload rejected with {}: {}", status.as_u16(), message);
            return Err(BackupError::RemoteUpload {
                status: Some(status.as_u16()),
                message,
            });
        }

        let file_id = serde_json::from_str::<Value>(&text)
            .ok()
            .and_then(|v| v.get("id").and_then(Value::as_str).map(str::to_string))
            .ok_or_else(|| BackupError::RemoteUpload {
                status: Some(status.as_u16()),
                message: "upload response did not include a file id".to_string(),
            })?;

        info!("Uploaded {} as remote file {}", file_name, file_id);
        Ok(file_id)
    }
}

/// A fresh part delimiter for one upload
pub fn new_boundary() -> String {
    format!("-------{}", Uuid::new_v4().simple())
}

pub fn multipart_body(boundary: &str, metadata: &str, content: &str) -> String {
    format!(
        "\r\n--{b}\r\nContent-Type: application/json\r\n\r\n{metadata}\r\n--{b}\r\nContent-Type: application/json\r\n\r\n{content}\r\n--{b}--",
        b = boundary,
        metadata = metadata,
        content = content,
    )
}

/// `error.message` from a JSON error body, else the status reason phrase
pub fn remote_error_message(status: StatusCode, body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            v.pointer("/error/message")
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .map(str::to_string)
                .unwrap_or_else(|| status.as_u16().to_string())
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Bytes,
        http::{HeaderMap, StatusCode as AxumStatus},
        routing::post,
        Json, Router,
    };
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_multipart_body_layout() {
        let body = multipart_body("-------abc", r#"{"name":"b.json"}"#, r#"{"routes":[]}"#);
        assert_eq!(
            body,
            "\r\n---------abc\r\nContent-Type: application/json\r\n\r\n{\"name\":\"b.json\"}\r\n---------abc\r\nContent-Type: application/json\r\n\r\n{\"routes\":[]}\r\n---------abc--"
        );
    }

    #[test]
    fn test_boundaries_are_unique() {
        let a = new_boundary();
        let b = new_boundary();
        assert!(a.starts_with("-------"));
        assert_eq!(a.len(), 7 + 32);
        assert_ne!(a, b);
    }

    #[test]
    fn test_remote_error_message() {
        let body = r#"{"error":{"code":401,"message":"Invalid Credentials"}}"#;
        assert_eq!(remote_error_message(StatusCode::UNAUTHORIZED, body), "Invalid Credentials");
        assert_eq!(remote_error_message(StatusCode::FORBIDDEN, "<html>"), "Forbidden");
    }

    async fn spawn_server(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}/upload", addr)
    }

    #[tokio::test]
    async fn test_upload_sends_bearer_and_multipart() {
        let seen: Arc<Mutex<Option<(String, String, String)>>> = Arc::new(Mutex::new(None));
        let captured = seen.clone();
        let app = Router::new().route(
            "/upload",
            post(move |headers: HeaderMap, body: Bytes| {
                let captured = captured.clone();
                async move {
                    let header_of = |name: &str| {
                        headers
                            .get(name)
                            .and_then(|v| v.to_str().ok())
                            .unwrap_or_default()
                            .to_string()
                    };
                    *captured.lock().unwrap() = Some((
                        header_of("authorization"),
                        header_of("content-type"),
                        String::from_utf8_lossy(&body).to_string(),
                    ));
                    Json(json!({ "id": "file-123" }))
                }
            }),
        );
        let endpoint = spawn_server(app).await;

        let uploader = DriveUploader::new(endpoint, Duration::from_secs(5)).unwrap();
        let id = uploader.upload("token-1", "school_backup_2024-05-10.json", "{}").await.unwrap();
        assert_eq!(id, "file-123");

        let (auth, content_type, body) = seen.lock().unwrap().clone().unwrap();
        assert_eq!(auth, "Bearer token-1");
        let boundary = content_type
            .strip_prefix("multipart/related; boundary=")
            .unwrap()
            .to_string();
        assert!(body.contains("\"name\":\"school_backup_2024-05-10.json\""));
        assert!(body.contains("\"mimeType\":\"application/json\""));
        assert!(body.ends_with(&format!("\r\n--{}--", boundary)));
    }

    #[tokio::test]
    async fn test_rejected_upload_carries_status_and_message() {
        let app = Router::new().route(
            "/upload",
            post(|| async {
                (
                    AxumStatus::UNAUTHORIZED,
                    Json(json!({ "error": { "message": "Invalid Credentials" } })),
                )
            }),
        );
        let endpoint = spawn_server(app).await;

        let uploader = DriveUploader::new(endpoint, Duration::from_secs(5)).unwrap();
        match uploader.upload("expired", "b.json", "{}").await {
            Err(BackupError::RemoteUpload { status, message }) => {
                assert_eq!(status, Some(401));
                assert_eq!(message, "Invalid Credentials");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_truncated_success_body_reports_read_failure() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();

            // Consume the whole request before answering
            let mut request = Vec::new();
            let mut chunk = [0u8; 4096];
            loop {
                let n = socket.read(&mut chunk).await.unwrap();
                request.extend_from_slice(&chunk[..n]);
                let text = String::from_utf8_lossy(&request).to_string();
                if let Some(head_end) = text.find("\r\n\r\n") {
                    let length = text[..head_end]
                        .lines()
                        .find_map(|line| {
                            let (name, value) = line.split_once(':')?;
                            name.eq_ignore_ascii_case("content-length")
                                .then(|| value.trim().parse::<usize>().ok())
                                .flatten()
                        })
                        .unwrap_or(0);
                    if request.len() >= head_end + 4 + length {
                        break;
                    }
                }
                if n == 0 {
                    break;
                }
            }

            socket
                .write_all(b"HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: 64\r\n\r\n{\"id\":")
                .await
                .unwrap();
            socket.shutdown().await.unwrap();
        });

        let uploader = DriveUploader::new(format!("http://{}/upload", addr), Duration::from_secs(5)).unwrap();
        match uploader.upload("t", "b.json", "{}").await {
            Err(BackupError::RemoteUpload { status, message }) => {
                assert_eq!(status, Some(200));
                assert!(message.starts_with("failed to read upload response"), "{}", message);
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_client_build_failure_is_its_own_category() {
        let source = Client::new().get("not a url").build().unwrap_err();
        let error = BackupError::HttpClient(source);

        assert!(error.to_string().starts_with("failed to build HTTP client"));
        assert!(std::error::Error::source(&error).is_some());
        assert!(!matches!(error, BackupError::RemoteUpload { .. }));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_has_no_status() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let uploader = DriveUploader::new(format!("http://{}/upload", addr), Duration::from_secs(5)).unwrap();
        let result = uploader.upload("t", "b.json", "{}").await;
        assert!(matches!(result, Err(BackupError::RemoteUpload { status: None, .. })));
    }
}
