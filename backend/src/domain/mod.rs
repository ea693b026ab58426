//! # Domain Module
//!
//! Business logic for the school transport records. Services here talk to
//! storage only through [`SchoolRepository`], and never see HTTP types.

pub mod attendance_service;
pub mod backup_service;
pub mod bulk_entry;
pub mod commands;
pub mod incident_service;
pub mod monthly_report;
pub mod report_export;
pub mod roster_service;
pub mod school_repository;
pub mod snapshot_service;

pub use attendance_service::AttendanceService;
pub use backup_service::BackupService;
pub use incident_service::IncidentService;
pub use monthly_report::MonthlyReportService;
pub use report_export::ReportExporter;
pub use roster_service::RosterService;
pub use school_repository::SchoolRepository;
pub use snapshot_service::{SnapshotError, SnapshotService};
