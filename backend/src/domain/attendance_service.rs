use anyhow::Result;
use chrono::{NaiveDate, Utc};
use shared::{AttendanceRecord, AttendanceStatus, DailySummary, RosterEntry, RosterGroup};
use std::collections::HashMap;
use tracing::info;

use crate::domain::commands::attendance::MarkAttendanceCommand;
use crate::domain::school_repository::SchoolRepository;

#[derive(Clone)]
pub struct AttendanceService {
    repository: SchoolRepository,
}

impl AttendanceService {
    pub fn new(repository: SchoolRepository) -> Self {
        Self { repository }
    }

    /// Record a status for (student, day). A second marking of the same day
    /// overwrites the first.
    pub async fn mark_attendance(&self, command: MarkAttendanceCommand) -> Result<AttendanceRecord> {
        let record = AttendanceRecord::new(
            &command.student_id,
            command.date,
            command.status,
            Utc::now().timestamp_millis(),
        );
        self.repository.save_attendance(record.clone()).await?;
        info!("Marked {} as {} on {}", record.student_id, record.status, record.date);
        Ok(record)
    }

    /// All records, or only those of one day
    pub async fn list_attendance(&self, date: Option<NaiveDate>) -> Result<Vec<AttendanceRecord>> {
        let records = match date {
            Some(date) => self.repository.attendance_on(date).await?,
            None => self.repository.list_attendance().await?,
        };
        Ok(records)
    }

    pub async fn delete_attendance(&self, id: &str) -> Result<bool> {
        Ok(self.repository.delete_attendance(id).await?)
    }

    pub async fn daily_summary(&self, date: NaiveDate) -> Result<DailySummary> {
        let total_students = self.repository.list_students().await?.len();
        let records = self.repository.attendance_on(date).await?;

        let present = records
            .iter()
            .filter(|r| r.status == AttendanceStatus::Present)
            .count();
        let absent = records
            .iter()
            .filter(|r| r.status == AttendanceStatus::Absent)
            .count();

        Ok(DailySummary {
            date,
            total_students,
            present,
            absent,
        })
    }

    /// Every marking of one student, oldest day first
    pub async fn student_history(&self, student_id: &str) -> Result<Vec<AttendanceRecord>> {
        let mut records = self.repository.attendance_for_student(student_id).await?;
        records.sort_by_key(|r| r.date);
        Ok(records)
    }

    /// Students grouped by route for one day, ordered by stop, each with the
    /// status marked that day (UNMARKED when none). Orphans are left out.
    pub async fn daily_roster(&self, date: NaiveDate) -> Result<Vec<RosterGroup>> {
        let routes = self.repository.list_routes().await?;
        let students = self.repository.list_students().await?;
        let statuses: HashMap<String, AttendanceStatus> = self
            .repository
            .attendance_on(date)
            .await?
            .into_iter()
            .map(|r| (r.student_id, r.status))
            .collect();

        let mut groups = Vec::with_capacity(routes.len());
        for route in routes {
            let stops = self.repository.stops_for_route(&route.id).await?;

            let entries = stops
                .iter()
                .flat_map(|stop| {
                    students
                        .iter()
                        .filter(move |student| student.stop_id == stop.id)
                        .map(move |student| (stop, student))
                })
                .map(|(stop, student)| RosterEntry {
                    student: student.clone(),
                    stop_name: stop.name.clone(),
                    status: statuses
                        .get(&student.id)
                        .copied()
                        .unwrap_or(AttendanceStatus::Unmarked),
                })
                .collect();

            groups.push(RosterGroup {
                route_id: route.id,
                route_name: route.name,
                students: entries,
            });
        }

        Ok(groups)
    }
}
