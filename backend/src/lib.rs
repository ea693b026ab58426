//! # School Transport Backend
//!
//! Local-first records for school transportation: routes, stops, students,
//! daily attendance and incidents, with monthly reports and backups.
//!
//! ## Architecture
//!
//! ```text
//! IO Layer (REST API, backup delivery)
//!     ↓
//! Domain Layer (services, report aggregation, snapshots)
//!     ↓
//! Storage Layer (RecordStore over SQLite)
//! ```

pub mod config;
pub mod domain;
pub mod io;
pub mod storage;

use anyhow::Result;
use axum::{
    extract::DefaultBodyLimit,
    http::Method,
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::config::{AppConfig, DEFAULT_MAX_RESTORE_BYTES};
use crate::domain::{
    AttendanceService, BackupService, IncidentService, MonthlyReportService, RosterService,
    SchoolRepository, SnapshotService,
};
use crate::io::backup::{DriveUploader, LocalBackupWriter, RemoteBackupStore};
use crate::io::rest::{
    attendance_apis, backup_apis, incident_apis, report_apis, route_apis, snapshot_apis,
    stop_apis, student_apis,
};
use crate::storage::{DbConnection, RecordStore};

/// Main application state that holds all services
#[derive(Clone)]
pub struct AppState {
    pub roster_service: RosterService,
    pub attendance_service: AttendanceService,
    pub incident_service: IncidentService,
    pub report_service: MonthlyReportService,
    pub snapshot_service: SnapshotService,
    pub backup_service: BackupService,
    /// Held for the duration of one backup
    pub backup_guard: Arc<Mutex<()>>,
    /// Body limit for snapshot restore uploads
    pub max_restore_bytes: usize,
}

impl AppState {
    pub fn build(
        store: Arc<dyn RecordStore>,
        local_backups: LocalBackupWriter,
        remote_backups: Arc<dyn RemoteBackupStore>,
    ) -> Self {
        let repository = SchoolRepository::new(store);
        let snapshot_service = SnapshotService::new(repository.clone());

        Self {
            roster_service: RosterService::new(repository.clone()),
            attendance_service: AttendanceService::new(repository.clone()),
            incident_service: IncidentService::new(repository.clone()),
            report_service: MonthlyReportService::new(repository),
            backup_service: BackupService::new(
                snapshot_service.clone(),
                local_backups,
                remote_backups,
            ),
            snapshot_service,
            backup_guard: Arc::new(Mutex::new(())),
            max_restore_bytes: DEFAULT_MAX_RESTORE_BYTES,
        }
    }
}

/// Open the database named by `config` and wire up every service
pub async fn initialize_backend(config: &AppConfig) -> Result<AppState> {
    info!("Setting up database at {}", config.database_path().display());
    let db_conn = DbConnection::open(config.database_path()).await?;

    info!("Setting up backup delivery to {}", config.backup_path().display());
    let local = LocalBackupWriter::new(config.backup_path());
    let remote = DriveUploader::new(
        config.upload_endpoint.clone(),
        Duration::from_secs(config.remote_timeout_secs),
    )?;

    let mut state = AppState::build(Arc::new(db_conn), local, Arc::new(remote));
    state.max_restore_bytes = config.max_restore_bytes;
    Ok(state)
}

/// Create the Axum router with all routes configured
pub fn create_router(app_state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers(Any);

    let api_routes = Router::new()
        .route("/routes", get(route_apis::list_routes).post(route_apis::save_route))
        .route("/routes/:id", delete(route_apis::delete_route))
        .route("/routes/:id/stops", get(route_apis::list_route_stops))
        .route("/stops", get(stop_apis::list_stops))
        .route("/stops/bulk", post(stop_apis::bulk_add_stops))
        .route("/stops/:id", put(stop_apis::edit_stop).delete(stop_apis::delete_stop))
        .route("/students", get(student_apis::list_students))
        .route("/students/bulk", post(student_apis::bulk_add_students))
        .route(
            "/students/:id",
            put(student_apis::edit_student).delete(student_apis::delete_student),
        )
        .route("/students/:id/attendance", get(attendance_apis::student_history))
        .route(
            "/attendance",
            get(attendance_apis::list_attendance).post(attendance_apis::mark_attendance),
        )
        .route("/attendance/summary", get(attendance_apis::daily_summary))
        .route("/attendance/roster", get(attendance_apis::daily_roster))
        .route("/attendance/:id", delete(attendance_apis::delete_attendance))
        .route(
            "/incidents",
            get(incident_apis::list_incidents).post(incident_apis::record_incident),
        )
        .route("/incidents/:id", delete(incident_apis::delete_incident))
        .route("/reports/monthly", get(report_apis::monthly_report))
        .route("/reports/monthly/csv", get(report_apis::monthly_report_csv))
        .route("/snapshot", get(snapshot_apis::export_snapshot))
        .route(
            "/snapshot/restore",
            post(snapshot_apis::restore_snapshot)
                .layer(DefaultBodyLimit::max(app_state.max_restore_bytes)),
        )
        .route("/backup", post(backup_apis::run_backup));

    Router::new()
        .nest("/api", api_routes)
        .layer(cors)
        .with_state(app_state)
}
