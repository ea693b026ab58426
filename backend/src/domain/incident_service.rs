use anyhow::Result;
use chrono::{SecondsFormat, Utc};
use shared::Incident;
use tracing::info;
use uuid::Uuid;

use crate::domain::commands::incidents::RecordIncidentCommand;
use crate::domain::school_repository::SchoolRepository;

/// Type used when a report is filed without one
pub const DEFAULT_INCIDENT_TYPE: &str = "General";

#[derive(Clone)]
pub struct IncidentService {
    repository: SchoolRepository,
}

impl IncidentService {
    pub fn new(repository: SchoolRepository) -> Self {
        Self { repository }
    }

    /// File a new incident stamped with the current date-time
    pub async fn record_incident(&self, command: RecordIncidentCommand) -> Result<Incident> {
        let now = Utc::now();
        let incident_type = match command.incident_type.trim() {
            "" => DEFAULT_INCIDENT_TYPE.to_string(),
            kind => kind.to_string(),
        };

        let incident = Incident {
            id: Uuid::new_v4().to_string(),
            student_id: command.student_id,
            incident_type,
            observation: command.observation,
            date: now.to_rfc3339_opts(SecondsFormat::Millis, true),
            timestamp: now.timestamp_millis(),
        };
        self.repository.save_incident(incident.clone()).await?;

        info!("Recorded {} incident for student {}", incident.incident_type, incident.student_id);
        Ok(incident)
    }

    /// All incidents, newest first
    pub async fn list_recent(&self) -> Result<Vec<Incident>> {
        let mut incidents = self.repository.list_incidents().await?;
        incidents.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(incidents)
    }

    pub async fn delete_incident(&self, id: &str) -> Result<bool> {
        Ok(self.repository.delete_incident(id).await?)
    }
}
