//! Typed CRUD over the record store.
//!
//! `SchoolRepository` is deliberately thin: one list/save/delete triple per
//! entity plus the few lookups that need more than one collection. It holds
//! no cached state, so every call reads the store.

use chrono::{NaiveDate, SubsecRound, Utc};
use shared::{AttendanceRecord, Incident, Route, Snapshot, Stop, Student};
use std::sync::Arc;
use tracing::info;

use crate::storage::{Collection, Entity, RecordStore, StoreError, StoreResult};

#[derive(Clone)]
pub struct SchoolRepository {
    store: Arc<dyn RecordStore>,
}

impl SchoolRepository {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// The underlying store, for whole-database operations such as restore
    pub fn store(&self) -> &Arc<dyn RecordStore> {
        &self.store
    }

    async fn list<T: Entity>(&self) -> StoreResult<Vec<T>> {
        self.store
            .get_all(T::COLLECTION)
            .await?
            .into_iter()
            .map(|record| {
                T::from_record(record).map_err(|stray| StoreError::WrongCollection {
                    expected: T::COLLECTION,
                    actual: stray.collection(),
                    id: stray.id().to_string(),
                })
            })
            .collect()
    }

    async fn save<T: Entity>(&self, entity: T) -> StoreResult<()> {
        self.store.put(&entity.into_record()).await
    }

    // Routes
    pub async fn list_routes(&self) -> StoreResult<Vec<Route>> {
        self.list().await
    }

    pub async fn save_route(&self, route: Route) -> StoreResult<()> {
        self.save(route).await
    }

    pub async fn delete_route(&self, id: &str) -> StoreResult<bool> {
        self.store.delete(Collection::Routes, id).await
    }

    // Stops
    pub async fn list_stops(&self) -> StoreResult<Vec<Stop>> {
        self.list().await
    }

    pub async fn save_stop(&self, stop: Stop) -> StoreResult<()> {
        self.save(stop).await
    }

    pub async fn delete_stop(&self, id: &str) -> StoreResult<bool> {
        self.store.delete(Collection::Stops, id).await
    }

    // Students
    pub async fn list_students(&self) -> StoreResult<Vec<Student>> {
        self.list().await
    }

    pub async fn save_student(&self, student: Student) -> StoreResult<()> {
        self.save(student).await
    }

    pub async fn delete_student(&self, id: &str) -> StoreResult<bool> {
        self.store.delete(Collection::Students, id).await
    }

    // Attendance
    pub async fn list_attendance(&self) -> StoreResult<Vec<AttendanceRecord>> {
        self.list().await
    }

    pub async fn attendance_on(&self, date: NaiveDate) -> StoreResult<Vec<AttendanceRecord>> {
        self.store.attendance_by_date(date).await
    }

    pub async fn attendance_for_student(&self, student_id: &str) -> StoreResult<Vec<AttendanceRecord>> {
        self.store.attendance_by_student(student_id).await
    }

    pub async fn save_attendance(&self, record: AttendanceRecord) -> StoreResult<()> {
        self.save(record).await
    }

    pub async fn delete_attendance(&self, id: &str) -> StoreResult<bool> {
        self.store.delete(Collection::Attendance, id).await
    }

    // Incidents
    pub async fn list_incidents(&self) -> StoreResult<Vec<Incident>> {
        self.list().await
    }

    pub async fn save_incident(&self, incident: Incident) -> StoreResult<()> {
        self.save(incident).await
    }

    pub async fn delete_incident(&self, id: &str) -> StoreResult<bool> {
        self.store.delete(Collection::Incidents, id).await
    }

    /// Size of the whole stop collection, across all routes
    pub async fn stop_count(&self) -> StoreResult<usize> {
        self.store.count(Collection::Stops).await
    }

    /// Stops of one route by pickup order; equal orders keep insertion order
    pub async fn stops_for_route(&self, route_id: &str) -> StoreResult<Vec<Stop>> {
        let mut stops: Vec<Stop> = self
            .list_stops()
            .await?
            .into_iter()
            .filter(|stop| stop.route_id == route_id)
            .collect();
        stops.sort_by_key(|stop| stop.order);
        Ok(stops)
    }

    /// Resolve a student's route through its stop. None for orphans.
    pub async fn route_id_for_student(&self, student: &Student) -> StoreResult<Option<String>> {
        let stops = self.list_stops().await?;
        Ok(stops
            .into_iter()
            .find(|stop| stop.id == student.stop_id)
            .map(|stop| stop.route_id))
    }

    /// Read every collection into one snapshot document
    pub async fn export_all_data(&self) -> StoreResult<Snapshot> {
        let routes = self.list_routes().await?;
        let stops = self.list_stops().await?;
        let students = self.list_students().await?;
        let attendance = self.list_attendance().await?;
        let incidents = self.list_incidents().await?;

        let snapshot = Snapshot {
            routes,
            stops,
            students,
            attendance,
            incidents,
            generated_at: Utc::now().trunc_subsecs(3),
        };

        info!("Exported snapshot with {} records", snapshot.summary().total());
        Ok(snapshot)
    }
}
