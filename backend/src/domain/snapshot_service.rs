//! Whole-store export and destructive restore.
use shared::{Snapshot, SnapshotSummary};
use thiserror::Error;
use tracing::{info, warn};

use crate::domain::school_repository::SchoolRepository;
use crate::storage::{Collection, Entity, Record, StoreError};

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("malformed snapshot: {0}")]
    Malformed(String),

    #[error("failed to encode snapshot: {0}")]
    Encode(#[source] serde_json::Error),

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Clone)]
pub struct SnapshotService {
    repository: SchoolRepository,
}

impl SnapshotService {
    pub fn new(repository: SchoolRepository) -> Self {
        Self { repository }
    }

    pub async fn export(&self) -> Result<Snapshot, SnapshotError> {
        Ok(self.repository.export_all_data().await?)
    }

    pub async fn export_json(&self) -> Result<(Snapshot, String), SnapshotError> {
        let snapshot = self.export().await?;
        let json = snapshot.to_json().map_err(SnapshotError::Encode)?;
        Ok((snapshot, json))
    }

    /// Parse and fully validate a snapshot document without touching the store
    pub fn parse(text: &str) -> Result<Snapshot, SnapshotError> {
        Snapshot::from_json(text).map_err(|e| SnapshotError::Malformed(e.to_string()))
    }

    /// Replace the entire store with `snapshot`. Ids are kept verbatim.
    pub async fn restore(&self, snapshot: Snapshot) -> Result<SnapshotSummary, SnapshotError> {
        let summary = snapshot.summary();
        let store = self.repository.store();

        warn!("Restoring snapshot from {}, clearing all collections", snapshot.generated_at);
        store.clear().await?;

        store
            .put_many(Collection::Routes, &into_records(snapshot.routes))
            .await?;
        store
            .put_many(Collection::Stops, &into_records(snapshot.stops))
            .await?;
        store
            .put_many(Collection::Students, &into_records(snapshot.students))
            .await?;
        store
            .put_many(Collection::Attendance, &into_records(snapshot.attendance))
            .await?;
        store
            .put_many(Collection::Incidents, &into_records(snapshot.incidents))
            .await?;

        info!("Restored {} records", summary.total());
        Ok(summary)
    }

    /// Parse first, then restore; a malformed document leaves the store as it was
    pub async fn restore_from_json(&self, text: &str) -> Result<(Snapshot, SnapshotSummary), SnapshotError> {
        let snapshot = Self::parse(text)?;
        let kept = snapshot.clone();
        let summary = self.restore(snapshot).await?;
        Ok((kept, summary))
    }
}

fn into_records<T: Entity>(items: Vec<T>) -> Vec<Record> {
    items.into_iter().map(T::into_record).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::DbConnection;
    use chrono::NaiveDate;
    use shared::{AttendanceRecord, AttendanceStatus, Incident, Route, Stop, Student};
    use std::sync::Arc;

    async fn setup_test() -> (SnapshotService, SchoolRepository) {
        let conn = DbConnection::in_memory().await.expect("Failed to open store");
        let repository = SchoolRepository::new(Arc::new(conn));
        (SnapshotService::new(repository.clone()), repository)
    }

    async fn seed(repo: &SchoolRepository) {
        repo.save_route(Route { id: "r1".to_string(), name: "North".to_string(), description: Some("AM".to_string()) })
            .await
            .unwrap();
        repo.save_stop(Stop { id: "p1".to_string(), route_id: "r1".to_string(), name: "Main".to_string(), order: 0 })
            .await
            .unwrap();
        repo.save_student(Student {
            id: "s1".to_string(),
            stop_id: "p1".to_string(),
            name: "Ana".to_string(),
            active: false,
            guardian_name: Some("Rita".to_string()),
            contact: Some("555-0100".to_string()),
        })
        .await
        .unwrap();
        repo.save_attendance(AttendanceRecord::new(
            "s1",
            NaiveDate::from_ymd_opt(2024, 5, 2).unwrap(),
            AttendanceStatus::Present,
            1714640000000,
        ))
        .await
        .unwrap();
        repo.save_incident(Incident {
            id: "i1".to_string(),
            student_id: "s1".to_string(),
            incident_type: "General".to_string(),
            observation: "Late".to_string(),
            date: "2024-05-02T07:30:00.000Z".to_string(),
            timestamp: 1714635000000,
        })
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_export_restore_round_trip() {
        let (service, repo) = setup_test().await;
        seed(&repo).await;

        let (before, json) = service.export_json().await.unwrap();

        // Drift the store away from the snapshot
        repo.delete_student("s1").await.unwrap();
        repo.save_route(Route { id: "r2".to_string(), name: "Extra".to_string(), description: None })
            .await
            .unwrap();

        let (_, summary) = service.restore_from_json(&json).await.unwrap();
        assert_eq!(summary, before.summary());

        let after = service.export().await.unwrap();
        assert_eq!(after.routes, before.routes);
        assert_eq!(after.stops, before.stops);
        assert_eq!(after.students, before.students);
        assert_eq!(after.attendance, before.attendance);
        assert_eq!(after.incidents, before.incidents);
    }

    #[tokio::test]
    async fn test_malformed_document_keeps_data() {
        let (service, repo) = setup_test().await;
        seed(&repo).await;

        let missing_key = r#"{"routes":[],"stops":[],"students":[],"attendance":[],"generatedAt":"2024-05-10T12:00:00.000Z"}"#;
        let result = service.restore_from_json(missing_key).await;
        assert!(matches!(result, Err(SnapshotError::Malformed(_))));

        let bad_status = r#"{"routes":[],"stops":[],"students":[],"incidents":[],
            "attendance":[{"id":"x","studentId":"s","date":"2024-05-01","status":"LATE","timestamp":0}],
            "generatedAt":"2024-05-10T12:00:00.000Z"}"#;
        assert!(matches!(
            service.restore_from_json(bad_status).await,
            Err(SnapshotError::Malformed(_))
        ));

        assert!(matches!(
            service.restore_from_json("not json").await,
            Err(SnapshotError::Malformed(_))
        ));

        let extra_student_field = r#"{"routes":[],"stops":[],"attendance":[],"incidents":[],
            "students":[{"id":"s9","stopId":"p1","name":"Old","active":true,"photoUrl":"x.png"}],
            "generatedAt":"2024-05-10T12:00:00.000Z"}"#;
        assert!(matches!(
            service.restore_from_json(extra_student_field).await,
            Err(SnapshotError::Malformed(_))
        ));

        assert_eq!(repo.list_students().await.unwrap().len(), 1);
        assert_eq!(repo.list_incidents().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_restore_empty_snapshot_clears_store() {
        let (service, repo) = setup_test().await;
        seed(&repo).await;

        let empty = r#"{"routes":[],"stops":[],"students":[],"attendance":[],"incidents":[],
            "generatedAt":"2024-05-10T12:00:00.000Z"}"#;
        let (_, summary) = service.restore_from_json(empty).await.unwrap();

        assert_eq!(summary.total(), 0);
        assert!(repo.list_routes().await.unwrap().is_empty());
        assert!(repo.list_attendance().await.unwrap().is_empty());
    }
}
