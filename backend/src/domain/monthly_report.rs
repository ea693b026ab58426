//! Monthly attendance aggregation.
//!
//! `MonthlyReportService::generate` is a pure function of the five
//! collections and a month: it never touches the store and returns the same
//! report for the same input. Students whose stop or route has gone missing
//! are dropped from every group instead of raising an error.

use anyhow::Result;
use chrono::Datelike;
use shared::{
    AttendanceRecord, AttendanceStatus, Incident, IncidentLine, MonthlyReport, ReportMonth, Route,
    RouteReportGroup, Stop, Student, StudentStats,
};
use std::collections::{BTreeSet, HashMap};
use tracing::info;

use crate::domain::school_repository::SchoolRepository;

/// Everything the aggregation reads, loaded in one go
#[derive(Debug, Clone, Default)]
pub struct ReportInput {
    pub routes: Vec<Route>,
    pub stops: Vec<Stop>,
    pub students: Vec<Student>,
    pub attendance: Vec<AttendanceRecord>,
    pub incidents: Vec<Incident>,
}

impl ReportInput {
    pub async fn load(repository: &SchoolRepository) -> Result<Self> {
        Ok(Self {
            routes: repository.list_routes().await?,
            stops: repository.list_stops().await?,
            students: repository.list_students().await?,
            attendance: repository.list_attendance().await?,
            incidents: repository.list_incidents().await?,
        })
    }
}

#[derive(Clone)]
pub struct MonthlyReportService {
    repository: SchoolRepository,
}

impl MonthlyReportService {
    pub fn new(repository: SchoolRepository) -> Self {
        Self { repository }
    }

    /// Load the current store contents and aggregate them for `month`
    pub async fn compute_monthly_report(&self, month: ReportMonth) -> Result<MonthlyReport> {
        let input = ReportInput::load(&self.repository).await?;
        let report = Self::generate(&input, month);

        let student_total: usize = report.routes.iter().map(|g| g.students.len()).sum();
        info!(
            "Computed report for {}: {} routes, {} students, {} incidents",
            month,
            report.routes.len(),
            student_total,
            report.incidents.len()
        );
        Ok(report)
    }

    pub fn generate(input: &ReportInput, month: ReportMonth) -> MonthlyReport {
        let stops_by_id: HashMap<&str, &Stop> =
            input.stops.iter().map(|stop| (stop.id.as_str(), stop)).collect();

        let mut groups: Vec<RouteReportGroup> = input
            .routes
            .iter()
            .map(|route| RouteReportGroup {
                route_id: route.id.clone(),
                route_name: route.name.clone(),
                students: Vec::new(),
            })
            .collect();
        let group_index: HashMap<String, usize> = groups
            .iter()
            .enumerate()
            .map(|(index, group)| (group.route_id.clone(), index))
            .collect();

        let mut names_by_id: HashMap<&str, &str> = HashMap::new();

        for student in &input.students {
            let Some(stop) = stops_by_id.get(student.stop_id.as_str()) else {
                continue;
            };
            let Some(&index) = group_index.get(&stop.route_id) else {
                continue;
            };

            groups[index].students.push(student_stats(student, input, month));
            names_by_id.insert(student.id.as_str(), student.name.as_str());
        }

        let incidents = input
            .incidents
            .iter()
            .filter(|incident| month.matches(&incident.date))
            .map(|incident| IncidentLine {
                incident_id: incident.id.clone(),
                date: incident.date.clone(),
                timestamp: incident.timestamp,
                student_name: names_by_id
                    .get(incident.student_id.as_str())
                    .map(|name| name.to_string()),
                incident_type: incident.incident_type.clone(),
                observation: incident.observation.clone(),
            })
            .collect();

        MonthlyReport {
            month,
            routes: groups,
            incidents,
        }
    }
}

fn student_stats(student: &Student, input: &ReportInput, month: ReportMonth) -> StudentStats {
    let mut present_count = 0;
    let mut absent_count = 0;
    let mut present_days = BTreeSet::new();
    let mut absent_days = BTreeSet::new();

    let records = input
        .attendance
        .iter()
        .filter(|record| record.student_id == student.id && month.contains(record.date));

    for record in records {
        match record.status {
            AttendanceStatus::Present => {
                present_count += 1;
                present_days.insert(record.date.day());
            }
            AttendanceStatus::Absent => {
                absent_count += 1;
                absent_days.insert(record.date.day());
            }
            AttendanceStatus::Unmarked => {}
        }
    }

    let incident_count = input
        .incidents
        .iter()
        .filter(|incident| incident.student_id == student.id && month.matches(&incident.date))
        .count();

    StudentStats {
        student: student.clone(),
        present_count,
        absent_count,
        present_days: present_days.into_iter().collect(),
        absent_days: absent_days.into_iter().collect(),
        incident_count,
        frequency_percent: frequency_percent(present_count, absent_count),
    }
}

/// Present share of recorded days; 0 when nothing was recorded
fn frequency_percent(present: usize, absent: usize) -> f64 {
    let recorded = (present + absent).max(1);
    present as f64 / recorded as f64 * 100.0
}
