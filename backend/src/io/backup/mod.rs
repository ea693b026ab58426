//! Backup delivery: a local JSON file and a remote multipart upload.

pub mod local_file;
pub mod remote_upload;

pub use local_file::LocalBackupWriter;
pub use remote_upload::{DriveUploader, RemoteBackupStore};

use std::path::PathBuf;
use thiserror::Error;

use crate::domain::snapshot_service::SnapshotError;

#[derive(Debug, Error)]
pub enum BackupError {
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),

    #[error("failed to write backup to {path}: {source}")]
    LocalDelivery {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),

    /// The remote store refused the upload, or could not be reached (`status` is None)
    #[error("remote upload failed: {message}")]
    RemoteUpload { status: Option<u16>, message: String },
}

/// `school_backup_<YYYY-MM-DD>.json`, shared by both delivery paths
pub fn backup_file_name(date: chrono::NaiveDate) -> String {
    format!("school_backup_{}.json", date.format("%Y-%m-%d"))
}
