//! Backup orchestration: export the store once, then deliver the document
//! to the local backup directory and to the remote store independently.

use chrono::NaiveDate;
use shared::{BackupReport, LocalOutcome, RemoteOutcome, Snapshot};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::domain::snapshot_service::SnapshotService;
use crate::io::backup::{backup_file_name, BackupError, LocalBackupWriter, RemoteBackupStore};

#[derive(Clone)]
pub struct BackupService {
    snapshots: SnapshotService,
    local: LocalBackupWriter,
    remote: Arc<dyn RemoteBackupStore>,
}

impl BackupService {
    pub fn new(
        snapshots: SnapshotService,
        local: LocalBackupWriter,
        remote: Arc<dyn RemoteBackupStore>,
    ) -> Self {
        Self {
            snapshots,
            local,
            remote,
        }
    }

    async fn produce(&self) -> Result<(Snapshot, String, String), BackupError> {
        let (snapshot, json) = self.snapshots.export_json().await?;
        let file_name = backup_file_name(snapshot_day(&snapshot));
        Ok((snapshot, json, file_name))
    }

    /// Write today's snapshot into the backup directory
    pub async fn backup_local(&self) -> Result<PathBuf, BackupError> {
        let (_, json, file_name) = self.produce().await?;
        self.local.write(&file_name, &json).await
    }

    /// Upload today's snapshot, returning the remote file id
    pub async fn backup_remote(&self, credential: &str) -> Result<String, BackupError> {
        let (_, json, file_name) = self.produce().await?;
        self.remote.upload(credential, &file_name, &json).await
    }

    /// Run both delivery legs against a single export.
    ///
    /// Only a failed export is an error. Leg failures are reported in the
    /// returned `BackupReport`; the remote leg runs even when the local one
    /// failed, and is skipped when no credential is given.
    pub async fn perform_backup(&self, credential: Option<&str>) -> Result<BackupReport, BackupError> {
        let (snapshot, json, file_name) = self.produce().await?;
        info!("Starting backup {} ({} records)", file_name, snapshot.summary().total());

        let local = match self.local.write(&file_name, &json).await {
            Ok(path) => LocalOutcome::Saved {
                path: path.display().to_string(),
            },
            Err(e) => {
                error!("Local backup failed: {}", e);
                LocalOutcome::Failed {
                    message: e.to_string(),
                }
            }
        };

        let remote = match credential {
            None => RemoteOutcome::Skipped {
                reason: "no credential provided".to_string(),
            },
            Some(credential) => match self.remote.upload(credential, &file_name, &json).await {
                Ok(file_id) => RemoteOutcome::Uploaded { file_id },
                Err(BackupError::RemoteUpload { status, message }) => {
                    warn!("Remote backup failed: {}", message);
                    RemoteOutcome::Failed {
                        http_status: status,
                        message,
                    }
                }
                Err(other) => RemoteOutcome::Failed {
                    http_status: None,
                    message: other.to_string(),
                },
            },
        };

        let report = BackupReport {
            generated_at: snapshot.generated_at,
            summary: snapshot.summary(),
            local,
            remote,
        };
        info!(
            "Backup finished: local_saved={} partial={}",
            report.is_success(),
            report.is_partial()
        );
        Ok(report)
    }
}

fn snapshot_day(snapshot: &Snapshot) -> NaiveDate {
    snapshot.generated_at.date_naive()
}
