use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::info;

use super::BackupError;

/// Writes snapshot documents into a backup directory
#[derive(Debug, Clone)]
pub struct LocalBackupWriter {
    directory: PathBuf,
}

impl LocalBackupWriter {
    pub fn new<P: Into<PathBuf>>(directory: P) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Write `content` as `file_name`, replacing any earlier file of that name.
    ///
    /// The bytes go to a sibling temp file first and are renamed into place,
    /// so a reader never sees a half-written backup.
    pub async fn write(&self, file_name: &str, content: &str) -> Result<PathBuf, BackupError> {
        fs::create_dir_all(&self.directory)
            .await
            .map_err(|source| BackupError::LocalDelivery {
                path: self.directory.clone(),
                source,
            })?;

        let target = self.directory.join(file_name);
        let staging = self.directory.join(format!(".{}.tmp", file_name));

        fs::write(&staging, content)
            .await
            .map_err(|source| BackupError::LocalDelivery {
                path: staging.clone(),
                source,
            })?;

        if let Err(source) = fs::rename(&staging, &target).await {
            let _ = fs::remove_file(&staging).await;
            return Err(BackupError::LocalDelivery {
                path: target,
                source,
            });
        }

        info!("Wrote local backup {} ({} bytes)", target.display(), content.len());
        Ok(target)
    }
}
