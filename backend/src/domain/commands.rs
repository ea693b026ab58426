//! Domain-level command types
//! These structs are used by services inside the domain layer and are **not**
//! exposed over the public API. The REST layer maps the public DTOs defined
//! in the `shared` crate to these internal types.

pub mod roster {
    /// Create a route, or rename the one with `id`.
    #[derive(Debug, Clone)]
    pub struct SaveRouteCommand {
        pub id: Option<String>,
        pub name: String,
        pub description: Option<String>,
    }

    /// Create one stop per name found in `names_input`.
    #[derive(Debug, Clone)]
    pub struct BulkAddStopsCommand {
        pub route_id: String,
        pub names_input: String,
    }

    /// Replace exactly one stop. `name` is used verbatim, never split.
    #[derive(Debug, Clone)]
    pub struct EditStopCommand {
        pub stop_id: String,
        pub route_id: String,
        pub name: String,
    }

    /// Create one student per name found in `names_input`.
    #[derive(Debug, Clone)]
    pub struct BulkAddStudentsCommand {
        pub stop_id: String,
        pub names_input: String,
    }

    /// Replace exactly one student. `name` is used verbatim, never split.
    #[derive(Debug, Clone)]
    pub struct EditStudentCommand {
        pub student_id: String,
        pub stop_id: String,
        pub name: String,
        pub active: bool,
        pub guardian_name: Option<String>,
        pub contact: Option<String>,
    }
}

pub mod attendance {
    use chrono::NaiveDate;
    use shared::AttendanceStatus;

    #[derive(Debug, Clone)]
    pub struct MarkAttendanceCommand {
        pub student_id: String,
        pub date: NaiveDate,
        pub status: AttendanceStatus,
    }
}

pub mod incidents {
    #[derive(Debug, Clone)]
    pub struct RecordIncidentCommand {
        pub student_id: String,
        pub incident_type: String,
        pub observation: String,
    }
}
