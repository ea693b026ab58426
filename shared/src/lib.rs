use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ---------------------------------------------------------------------------
// Entities
// ---------------------------------------------------------------------------

/// A named transportation line composed of ordered stops
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Route {
    pub id: String,
    /// Display name, e.g. "North Loop". Not unique.
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A pickup/drop-off point belonging to one route
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Stop {
    pub id: String,
    /// Soft reference: the route may have been deleted
    pub route_id: String,
    pub name: String,
    /// Pickup sequence within the route; ties keep insertion order
    pub order: u32,
}

/// A rider assigned to one stop
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Student {
    pub id: String,
    /// Soft reference: the stop may have been deleted
    pub stop_id: String,
    pub name: String,
    /// Informational only, never used for filtering
    pub active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guardian_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AttendanceStatus {
    Present,
    Absent,
    Unmarked,
}

impl AttendanceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttendanceStatus::Present => "PRESENT",
            AttendanceStatus::Absent => "ABSENT",
            AttendanceStatus::Unmarked => "UNMARKED",
        }
    }
}

impl FromStr for AttendanceStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PRESENT" => Ok(AttendanceStatus::Present),
            "ABSENT" => Ok(AttendanceStatus::Absent),
            "UNMARKED" => Ok(AttendanceStatus::Unmarked),
            other => Err(format!("unknown attendance status: {}", other)),
        }
    }
}

impl fmt::Display for AttendanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-student, per-day presence status.
///
/// The id is always `<date>_<studentId>`; that composite key is what keeps a
/// student to a single status per day. Saving the same day twice overwrites.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AttendanceRecord {
    pub id: String,
    pub student_id: String,
    /// Calendar day, serialized as YYYY-MM-DD
    pub date: NaiveDate,
    pub status: AttendanceStatus,
    /// Epoch milliseconds of the last marking
    pub timestamp: i64,
}

impl AttendanceRecord {
    /// Build the composite key for a (day, student) pair
    pub fn composite_id(date: NaiveDate, student_id: &str) -> String {
        format!("{}_{}", date.format("%Y-%m-%d"), student_id)
    }

    pub fn new(student_id: &str, date: NaiveDate, status: AttendanceStatus, timestamp: i64) -> Self {
        Self {
            id: Self::composite_id(date, student_id),
            student_id: student_id.to_string(),
            date,
            status,
            timestamp,
        }
    }
}

/// A free-text observation tied to a student and a date
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Incident {
    pub id: String,
    pub student_id: String,
    #[serde(rename = "type")]
    pub incident_type: String,
    pub observation: String,
    /// ISO-8601 date or date-time string, matched by YYYY-MM prefix in reports
    pub date: String,
    /// Epoch milliseconds when the incident was recorded
    pub timestamp: i64,
}

// ---------------------------------------------------------------------------
// Snapshot document
// ---------------------------------------------------------------------------

/// The entire record store as one interchange document (backup file / restore input)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Snapshot {
    pub routes: Vec<Route>,
    pub stops: Vec<Stop>,
    pub students: Vec<Student>,
    pub attendance: Vec<AttendanceRecord>,
    pub incidents: Vec<Incident>,
    #[serde(with = "millis_utc")]
    pub generated_at: DateTime<Utc>,
}

impl Snapshot {
    /// Pretty-printed document, two-space indented
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }

    pub fn summary(&self) -> SnapshotSummary {
        SnapshotSummary {
            routes: self.routes.len(),
            stops: self.stops.len(),
            students: self.students.len(),
            attendance: self.attendance.len(),
            incidents: self.incidents.len(),
        }
    }
}

/// Record counts per collection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotSummary {
    pub routes: usize,
    pub stops: usize,
    pub students: usize,
    pub attendance: usize,
    pub incidents: usize,
}

impl SnapshotSummary {
    pub fn total(&self) -> usize {
        self.routes + self.stops + self.students + self.attendance + self.incidents
    }
}

/// RFC 3339 UTC with exactly three fractional digits, e.g. 2024-05-10T12:00:00.123Z
mod millis_utc {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_rfc3339_opts(SecondsFormat::Millis, true))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|parsed| parsed.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// Reporting
// ---------------------------------------------------------------------------

/// A calendar month, written as YYYY-MM
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ReportMonth {
    year: i32,
    month: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportMonthError(pub String);

impl fmt::Display for ReportMonthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid month '{}', expected YYYY-MM", self.0)
    }
}

impl std::error::Error for ReportMonthError {}

impl ReportMonth {
    pub fn new(year: i32, month: u32) -> Result<Self, ReportMonthError> {
        if !(1..=12).contains(&month) || !(0..=9999).contains(&year) {
            return Err(ReportMonthError(format!("{}-{}", year, month)));
        }
        Ok(Self { year, month })
    }

    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    /// The YYYY-MM prefix shared by every date string of this month
    pub fn prefix(&self) -> String {
        format!("{:04}-{:02}", self.year, self.month)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date.year() == self.year && date.month() == self.month
    }

    /// Prefix match on a raw date / date-time string
    pub fn matches(&self, date: &str) -> bool {
        date.starts_with(&self.prefix())
    }

    pub fn days_in_month(&self) -> u32 {
        let (next_year, next_month) = if self.month == 12 {
            (self.year + 1, 1)
        } else {
            (self.year, self.month + 1)
        };
        NaiveDate::from_ymd_opt(next_year, next_month, 1)
            .and_then(|first| first.pred_opt())
            .map(|last| last.day())
            .unwrap_or(31)
    }
}

impl FromStr for ReportMonth {
    type Err = ReportMonthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ReportMonthError(s.to_string());
        let (year, month) = s.trim().split_once('-').ok_or_else(invalid)?;
        if year.len() != 4 || month.len() != 2 {
            return Err(invalid());
        }
        let year: i32 = year.parse().map_err(|_| invalid())?;
        let month: u32 = month.parse().map_err(|_| invalid())?;
        Self::new(year, month).map_err(|_| invalid())
    }
}

impl TryFrom<String> for ReportMonth {
    type Error = ReportMonthError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ReportMonth> for String {
    fn from(month: ReportMonth) -> Self {
        month.prefix()
    }
}

impl fmt::Display for ReportMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.prefix())
    }
}

/// How a single calendar day renders for one student
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DayMark {
    Present,
    Absent,
    Unmarked,
}

/// Monthly attendance statistics for one student
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentStats {
    pub student: Student,
    pub present_count: usize,
    pub absent_count: usize,
    /// Days of month (1-31), ascending
    pub present_days: Vec<u32>,
    /// Days of month (1-31), ascending
    pub absent_days: Vec<u32>,
    pub incident_count: usize,
    /// present / (present + absent), 0 when nothing was recorded
    pub frequency_percent: f64,
}

impl StudentStats {
    /// One mark per day of the month
    pub fn calendar(&self, month: ReportMonth) -> Vec<(u32, DayMark)> {
        (1..=month.days_in_month())
            .map(|day| {
                let mark = if self.absent_days.contains(&day) {
                    DayMark::Absent
                } else if self.present_days.contains(&day) {
                    DayMark::Present
                } else {
                    DayMark::Unmarked
                };
                (day, mark)
            })
            .collect()
    }
}

/// One route's section of a monthly report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteReportGroup {
    pub route_id: String,
    pub route_name: String,
    pub students: Vec<StudentStats>,
}

/// An incident of the reported month with its student's name resolved
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncidentLine {
    pub incident_id: String,
    pub date: String,
    pub timestamp: i64,
    /// None when the student is unknown or excluded as an orphan
    pub student_name: Option<String>,
    #[serde(rename = "type")]
    pub incident_type: String,
    pub observation: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyReport {
    pub month: ReportMonth,
    /// Route groups in route insertion order
    pub routes: Vec<RouteReportGroup>,
    pub incidents: Vec<IncidentLine>,
}

impl MonthlyReport {
    pub fn route(&self, route_id: &str) -> Option<&RouteReportGroup> {
        self.routes.iter().find(|group| group.route_id == route_id)
    }
}

// ---------------------------------------------------------------------------
// Daily attendance views
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailySummary {
    pub date: NaiveDate,
    pub total_students: usize,
    pub present: usize,
    pub absent: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterEntry {
    pub student: Student,
    pub stop_name: String,
    pub status: AttendanceStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterGroup {
    pub route_id: String,
    pub route_name: String,
    pub students: Vec<RosterEntry>,
}

// ---------------------------------------------------------------------------
// API requests / responses
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveRouteRequest {
    /// Existing id to rename, or None to create
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkAddStopsRequest {
    pub route_id: String,
    /// Names separated by newlines and/or commas
    pub names: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditStopRequest {
    pub route_id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkAddStudentsRequest {
    pub stop_id: String,
    /// Names separated by newlines and/or commas
    pub names: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditStudentRequest {
    pub stop_id: String,
    pub name: String,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default)]
    pub guardian_name: Option<String>,
    #[serde(default)]
    pub contact: Option<String>,
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkAttendanceRequest {
    pub student_id: String,
    /// Defaults to today
    #[serde(default)]
    pub date: Option<NaiveDate>,
    pub status: AttendanceStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordIncidentRequest {
    pub student_id: String,
    #[serde(default, rename = "type")]
    pub incident_type: String,
    pub observation: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteResponse {
    pub deleted: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestoreResponse {
    pub restored: SnapshotSummary,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupRequest {
    /// Bearer credential for remote delivery; omit for a local-only backup
    #[serde(default)]
    pub credential: Option<String>,
}

/// Result of the local delivery leg
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LocalOutcome {
    Saved { path: String },
    Failed { message: String },
}

/// Result of the remote delivery leg
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RemoteOutcome {
    Uploaded { file_id: String },
    Skipped { reason: String },
    Failed { http_status: Option<u16>, message: String },
}

/// Outcome of a full backup: both legs are reported independently
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupReport {
    pub generated_at: DateTime<Utc>,
    pub summary: SnapshotSummary,
    pub local: LocalOutcome,
    pub remote: RemoteOutcome,
}

impl BackupReport {
    /// A backup counts as successful as soon as a local copy exists
    pub fn is_success(&self) -> bool {
        matches!(self.local, LocalOutcome::Saved { .. })
    }

    /// True when some leg failed while the other did not
    pub fn is_partial(&self) -> bool {
        let remote_failed = matches!(self.remote, RemoteOutcome::Failed { .. });
        let remote_ok = matches!(self.remote, RemoteOutcome::Uploaded { .. });
        (self.is_success() && remote_failed) || (!self.is_success() && remote_ok)
    }
}
