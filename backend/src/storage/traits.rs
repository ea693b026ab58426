//! # Storage Traits
//!
//! The storage abstraction used by the domain layer, plus the closed set of
//! collections and the typed record variants that flow through it.

use async_trait::async_trait;
use chrono::NaiveDate;
use shared::{AttendanceRecord, Incident, Route, Stop, Student};
use std::fmt;

use super::error::StoreResult;

/// The five independent collections of the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Routes,
    Stops,
    Students,
    Attendance,
    Incidents,
}

impl Collection {
    /// Every collection, in snapshot order
    pub const ALL: [Collection; 5] = [
        Collection::Routes,
        Collection::Stops,
        Collection::Students,
        Collection::Attendance,
        Collection::Incidents,
    ];

    pub fn table_name(&self) -> &'static str {
        match self {
            Collection::Routes => "routes",
            Collection::Stops => "stops",
            Collection::Students => "students",
            Collection::Attendance => "attendance",
            Collection::Incidents => "incidents",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table_name())
    }
}

/// A stored item, tagged with its entity kind
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    Route(Route),
    Stop(Stop),
    Student(Student),
    Attendance(AttendanceRecord),
    Incident(Incident),
}

impl Record {
    pub fn collection(&self) -> Collection {
        match self {
            Record::Route(_) => Collection::Routes,
            Record::Stop(_) => Collection::Stops,
            Record::Student(_) => Collection::Students,
            Record::Attendance(_) => Collection::Attendance,
            Record::Incident(_) => Collection::Incidents,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Record::Route(r) => &r.id,
            Record::Stop(s) => &s.id,
            Record::Student(s) => &s.id,
            Record::Attendance(a) => &a.id,
            Record::Incident(i) => &i.id,
        }
    }
}

/// Typed access to the records of one collection
pub trait Entity: Sized + Send + Sync + 'static {
    const COLLECTION: Collection;

    fn into_record(self) -> Record;

    /// Unwrap a record of this kind, handing it back untouched otherwise
    fn from_record(record: Record) -> Result<Self, Record>;
}

macro_rules! impl_entity {
    ($entity:ty, $collection:ident, $variant:ident) => {
        impl Entity for $entity {
            const COLLECTION: Collection = Collection::$collection;

            fn into_record(self) -> Record {
                Record::$variant(self)
            }

            fn from_record(record: Record) -> Result<Self, Record> {
                match record {
                    Record::$variant(inner) => Ok(inner),
                    other => Err(other),
                }
            }
        }
    };
}

impl_entity!(Route, Routes, Route);
impl_entity!(Stop, Stops, Stop);
impl_entity!(Student, Students, Student);
impl_entity!(AttendanceRecord, Attendance, Attendance);
impl_entity!(Incident, Incidents, Incident);

/// Trait defining the interface for record storage operations
///
/// Implementations must keep each write atomic within its collection. Callers
/// are expected to issue writes to one collection from a single flow; the
/// trait makes no promise about concurrent writers to the same collection.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// All records of a collection, in insertion order
    async fn get_all(&self, collection: Collection) -> StoreResult<Vec<Record>>;

    /// Insert the record, or fully overwrite the one with the same id
    async fn put(&self, record: &Record) -> StoreResult<()>;

    /// Upsert many records of one collection in a single transaction
    async fn put_many(&self, collection: Collection, records: &[Record]) -> StoreResult<()>;

    /// Delete by id. Returns false when nothing was stored under that id.
    async fn delete(&self, collection: Collection, id: &str) -> StoreResult<bool>;

    /// Empty every collection
    async fn clear(&self) -> StoreResult<()>;

    /// Number of records currently in a collection
    async fn count(&self, collection: Collection) -> StoreResult<usize>;

    /// Attendance records for one calendar day, in insertion order
    async fn attendance_by_date(&self, date: NaiveDate) -> StoreResult<Vec<AttendanceRecord>>;

    /// Attendance records for one student, in insertion order
    async fn attendance_by_student(&self, student_id: &str) -> StoreResult<Vec<AttendanceRecord>>;
}
