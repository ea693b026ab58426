//! SQLite implementation of [`RecordStore`].
//!
//! Each collection is its own table keyed by `id`. Rows come back in `ROWID`
//! order, which is insertion order; upserts go through
//! `ON CONFLICT(id) DO UPDATE` so an overwritten record keeps its original
//! position.

use async_trait::async_trait;
use chrono::NaiveDate;
use shared::{AttendanceRecord, AttendanceStatus, Incident, Route, Stop, Student};
use sqlx::sqlite::SqliteRow;
use sqlx::{Executor, Row, Sqlite};
use tracing::{debug, info};

use super::connection::DbConnection;
use super::error::{StoreError, StoreResult};
use super::traits::{Collection, Record, RecordStore};

const DATE_FORMAT: &str = "%Y-%m-%d";

const SELECT_ATTENDANCE: &str = "SELECT id, student_id, date, status, timestamp FROM attendance";

fn select_all_sql(collection: Collection) -> &'static str {
    match collection {
        Collection::Routes => "SELECT id, name, description FROM routes ORDER BY rowid",
        Collection::Stops => "SELECT id, route_id, name, sort_order FROM stops ORDER BY rowid",
        Collection::Students => {
            "SELECT id, stop_id, name, active, guardian_name, contact FROM students ORDER BY rowid"
        }
        Collection::Attendance => {
            "SELECT id, student_id, date, status, timestamp FROM attendance ORDER BY rowid"
        }
        Collection::Incidents => {
            "SELECT id, student_id, type, observation, date, timestamp FROM incidents ORDER BY rowid"
        }
    }
}

fn corrupt(collection: Collection, id: &str, detail: impl Into<String>) -> StoreError {
    StoreError::Corrupt {
        collection,
        id: id.to_string(),
        detail: detail.into(),
    }
}

fn route_from_row(row: &SqliteRow) -> StoreResult<Route> {
    Ok(Route {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        description: row.try_get("description")?,
    })
}

fn stop_from_row(row: &SqliteRow) -> StoreResult<Stop> {
    let id: String = row.try_get("id")?;
    let raw_order: i64 = row.try_get("sort_order")?;
    let order = u32::try_from(raw_order)
        .map_err(|_| corrupt(Collection::Stops, &id, format!("order out of range: {}", raw_order)))?;

    Ok(Stop {
        route_id: row.try_get("route_id")?,
        name: row.try_get("name")?,
        order,
        id,
    })
}

fn student_from_row(row: &SqliteRow) -> StoreResult<Student> {
    Ok(Student {
        id: row.try_get("id")?,
        stop_id: row.try_get("stop_id")?,
        name: row.try_get("name")?,
        active: row.try_get("active")?,
        guardian_name: row.try_get("guardian_name")?,
        contact: row.try_get("contact")?,
    })
}

fn attendance_from_row(row: &SqliteRow) -> StoreResult<AttendanceRecord> {
    let id: String = row.try_get("id")?;
    let raw_date: String = row.try_get("date")?;
    let date = NaiveDate::parse_from_str(&raw_date, DATE_FORMAT)
        .map_err(|e| corrupt(Collection::Attendance, &id, format!("bad date '{}': {}", raw_date, e)))?;
    let raw_status: String = row.try_get("status")?;
    let status: AttendanceStatus = raw_status
        .parse()
        .map_err(|e: String| corrupt(Collection::Attendance, &id, e))?;

    Ok(AttendanceRecord {
        student_id: row.try_get("student_id")?,
        timestamp: row.try_get("timestamp")?,
        date,
        status,
        id,
    })
}

fn incident_from_row(row: &SqliteRow) -> StoreResult<Incident> {
    Ok(Incident {
        id: row.try_get("id")?,
        student_id: row.try_get("student_id")?,
        incident_type: row.try_get("type")?,
        observation: row.try_get("observation")?,
        date: row.try_get("date")?,
        timestamp: row.try_get("timestamp")?,
    })
}

fn record_from_row(collection: Collection, row: &SqliteRow) -> StoreResult<Record> {
    Ok(match collection {
        Collection::Routes => Record::Route(route_from_row(row)?),
        Collection::Stops => Record::Stop(stop_from_row(row)?),
        Collection::Students => Record::Student(student_from_row(row)?),
        Collection::Attendance => Record::Attendance(attendance_from_row(row)?),
        Collection::Incidents => Record::Incident(incident_from_row(row)?),
    })
}

/// Insert or fully overwrite one record, on either the pool or an open transaction
async fn upsert<'e, E>(executor: E, record: &Record) -> Result<(), sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    match record {
        Record::Route(route) => {
            sqlx::query(
                r#"
                INSERT INTO routes (id, name, description)
                VALUES (?, ?, ?)
                ON CONFLICT(id) DO UPDATE SET
                    name = excluded.name,
                    description = excluded.description
                "#,
            )
            .bind(&route.id)
            .bind(&route.name)
            .bind(&route.description)
            .execute(executor)
            .await?;
        }
        Record::Stop(stop) => {
            sqlx::query(
                r#"
                INSERT INTO stops (id, route_id, name, sort_order)
                VALUES (?, ?, ?, ?)
                ON CONFLICT(id) DO UPDATE SET
                    route_id = excluded.route_id,
                    name = excluded.name,
                    sort_order = excluded.sort_order
                "#,
            )
            .bind(&stop.id)
            .bind(&stop.route_id)
            .bind(&stop.name)
            .bind(i64::from(stop.order))
            .execute(executor)
            .await?;
        }
        Record::Student(student) => {
            sqlx::query(
                r#"
                INSERT INTO students (id, stop_id, name, active, guardian_name, contact)
                VALUES (?, ?, ?, ?, ?, ?)
                ON CONFLICT(id) DO UPDATE SET
                    stop_id = excluded.stop_id,
                    name = excluded.name,
                    active = excluded.active,
                    guardian_name = excluded.guardian_name,
                    contact = excluded.contact
                "#,
            )
            .bind(&student.id)
            .bind(&student.stop_id)
            .bind(&student.name)
            .bind(student.active)
            .bind(&student.guardian_name)
            .bind(&student.contact)
            .execute(executor)
            .await?;
        }
        Record::Attendance(attendance) => {
            sqlx::query(
                r#"
                INSERT INTO attendance (id, student_id, date, status, timestamp)
                VALUES (?, ?, ?, ?, ?)
                ON CONFLICT(id) DO UPDATE SET
                    student_id = excluded.student_id,
                    date = excluded.date,
                    status = excluded.status,
                    timestamp = excluded.timestamp
                "#,
            )
            .bind(&attendance.id)
            .bind(&attendance.student_id)
            .bind(attendance.date.format(DATE_FORMAT).to_string())
            .bind(attendance.status.as_str())
            .bind(attendance.timestamp)
            .execute(executor)
            .await?;
        }
        Record::Incident(incident) => {
            sqlx::query(
                r#"
                INSERT INTO incidents (id, student_id, type, observation, date, timestamp)
                VALUES (?, ?, ?, ?, ?, ?)
                ON CONFLICT(id) DO UPDATE SET
                    student_id = excluded.student_id,
                    type = excluded.type,
                    observation = excluded.observation,
                    date = excluded.date,
                    timestamp = excluded.timestamp
                "#,
            )
            .bind(&incident.id)
            .bind(&incident.student_id)
            .bind(&incident.incident_type)
            .bind(&incident.observation)
            .bind(&incident.date)
            .bind(incident.timestamp)
            .execute(executor)
            .await?;
        }
    }
    Ok(())
}

#[async_trait]
impl RecordStore for DbConnection {
    async fn get_all(&self, collection: Collection) -> StoreResult<Vec<Record>> {
        let rows = sqlx::query(select_all_sql(collection))
            .fetch_all(self.pool())
            .await?;

        rows.iter()
            .map(|row| record_from_row(collection, row))
            .collect()
    }

    async fn put(&self, record: &Record) -> StoreResult<()> {
        upsert(self.pool(), record).await?;
        debug!("Stored {} record {}", record.collection(), record.id());
        Ok(())
    }

    async fn put_many(&self, collection: Collection, records: &[Record]) -> StoreResult<()> {
        if let Some(stray) = records.iter().find(|r| r.collection() != collection) {
            return Err(StoreError::WrongCollection {
                expected: collection,
                actual: stray.collection(),
                id: stray.id().to_string(),
            });
        }

        let mut tx = self.pool().begin().await?;
        for record in records {
            upsert(&mut *tx, record).await?;
        }
        tx.commit().await?;

        debug!("Stored {} {} records", records.len(), collection);
        Ok(())
    }

    async fn delete(&self, collection: Collection, id: &str) -> StoreResult<bool> {
        let sql = format!("DELETE FROM {} WHERE id = ?", collection.table_name());
        let result = sqlx::query(&sql).bind(id).execute(self.pool()).await?;

        let deleted = result.rows_affected() > 0;
        if deleted {
            debug!("Deleted {} record {}", collection, id);
        } else {
            debug!("Delete of missing {} record {} ignored", collection, id);
        }
        Ok(deleted)
    }

    async fn clear(&self) -> StoreResult<()> {
        let mut tx = self.pool().begin().await?;
        for collection in Collection::ALL {
            let sql = format!("DELETE FROM {}", collection.table_name());
            sqlx::query(&sql).execute(&mut *tx).await?;
        }
        tx.commit().await?;

        info!("Cleared all collections");
        Ok(())
    }

    async fn count(&self, collection: Collection) -> StoreResult<usize> {
        let sql = format!("SELECT COUNT(*) FROM {}", collection.table_name());
        let (count,): (i64,) = sqlx::query_as(&sql).fetch_one(self.pool()).await?;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    async fn attendance_by_date(&self, date: NaiveDate) -> StoreResult<Vec<AttendanceRecord>> {
        let sql = format!("{} WHERE date = ? ORDER BY rowid", SELECT_ATTENDANCE);
        let rows = sqlx::query(&sql)
            .bind(date.format(DATE_FORMAT).to_string())
            .fetch_all(self.pool())
            .await?;

        rows.iter().map(attendance_from_row).collect()
    }

    async fn attendance_by_student(&self, student_id: &str) -> StoreResult<Vec<AttendanceRecord>> {
        let sql = format!("{} WHERE student_id = ? ORDER BY rowid", SELECT_ATTENDANCE);
        let rows = sqlx::query(&sql)
            .bind(student_id)
            .fetch_all(self.pool())
            .await?;

        rows.iter().map(attendance_from_row).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn route(id: &str, name: &str) -> Record {
        Record::Route(Route {
            id: id.to_string(),
            name: name.to_string(),
            description: None,
        })
    }

    fn attendance(student_id: &str, day: u32, status: AttendanceStatus) -> Record {
        let date = NaiveDate::from_ymd_opt(2024, 5, day).unwrap();
        Record::Attendance(AttendanceRecord::new(student_id, date, status, 1_000 + day as i64))
    }

    async fn setup_test_store() -> DbConnection {
        DbConnection::in_memory().await.expect("Failed to open in-memory store")
    }

    #[tokio::test]
    async fn test_get_all_keeps_insertion_order_across_overwrites() {
        let store = setup_test_store().await;

        store.put(&route("r-b", "Bravo")).await.unwrap();
        store.put(&route("r-a", "Alpha")).await.unwrap();
        store.put(&route("r-c", "Charlie")).await.unwrap();
        store.put(&route("r-b", "Bravo renamed")).await.unwrap();

        let routes = store.get_all(Collection::Routes).await.unwrap();
        let ids: Vec<&str> = routes.iter().map(|r| r.id()).collect();
        assert_eq!(ids, vec!["r-b", "r-a", "r-c"]);
        assert_eq!(routes[0], route("r-b", "Bravo renamed"));
    }

    #[tokio::test]
    async fn test_round_trips_every_entity_kind() {
        let store = setup_test_store().await;

        let records = vec![
            Record::Stop(Stop {
                id: "p1".to_string(),
                route_id: "r1".to_string(),
                name: "Old Mill".to_string(),
                order: 3,
            }),
            Record::Student(Student {
                id: "s1".to_string(),
                stop_id: "p1".to_string(),
                name: "Ana".to_string(),
                active: false,
                guardian_name: Some("Maria".to_string()),
                contact: None,
            }),
            attendance("s1", 10, AttendanceStatus::Unmarked),
            Record::Incident(Incident {
                id: "i1".to_string(),
                student_id: "s1".to_string(),
                incident_type: "Delay".to_string(),
                observation: "Late to the stop".to_string(),
                date: "2024-05-10T07:31:00.000Z".to_string(),
                timestamp: 1715326260000,
            }),
        ];

        for record in &records {
            store.put(record).await.unwrap();
        }

        for record in &records {
            let stored = store.get_all(record.collection()).await.unwrap();
            assert_eq!(stored, vec![record.clone()]);
        }
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let store = setup_test_store().await;
        store.put(&route("r1", "North")).await.unwrap();

        assert!(store.delete(Collection::Routes, "r1").await.unwrap());
        assert!(!store.delete(Collection::Routes, "r1").await.unwrap());
        assert!(!store.delete(Collection::Stops, "never-existed").await.unwrap());
        assert_eq!(store.count(Collection::Routes).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_attendance_secondary_lookups() {
        let store = setup_test_store().await;
        store.put(&attendance("s1", 10, AttendanceStatus::Present)).await.unwrap();
        store.put(&attendance("s2", 10, AttendanceStatus::Absent)).await.unwrap();
        store.put(&attendance("s1", 11, AttendanceStatus::Absent)).await.unwrap();

        let day = NaiveDate::from_ymd_opt(2024, 5, 10).unwrap();
        let by_date = store.attendance_by_date(day).await.unwrap();
        assert_eq!(by_date.len(), 2);
        assert!(by_date.iter().all(|a| a.date == day));

        let by_student = store.attendance_by_student("s1").await.unwrap();
        let days: Vec<u32> = by_student.iter().map(|a| chrono::Datelike::day(&a.date)).collect();
        assert_eq!(days, vec![10, 11]);
    }

    #[tokio::test]
    async fn test_clear_empties_every_collection() {
        let store = setup_test_store().await;
        store.put(&route("r1", "North")).await.unwrap();
        store.put(&attendance("s1", 10, AttendanceStatus::Present)).await.unwrap();

        store.clear().await.unwrap();

        for collection in Collection::ALL {
            assert_eq!(store.count(collection).await.unwrap(), 0);
        }
    }

    #[tokio::test]
    async fn test_put_many_rejects_foreign_records() {
        let store = setup_test_store().await;
        let mixed = vec![route("r1", "North"), attendance("s1", 10, AttendanceStatus::Present)];

        let err = store.put_many(Collection::Routes, &mixed).await.unwrap_err();
        assert!(matches!(err, StoreError::WrongCollection { .. }));
        assert_eq!(store.count(Collection::Routes).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_corrupt_row_surfaces_as_store_error() {
        let store = setup_test_store().await;
        sqlx::query(
            "INSERT INTO attendance (id, student_id, date, status, timestamp) VALUES ('x', 's1', '2024-05-10', 'LATE', 0)",
        )
        .execute(store.pool())
        .await
        .unwrap();

        let err = store.get_all(Collection::Attendance).await.unwrap_err();
        match err {
            StoreError::Corrupt { collection, id, .. } => {
                assert_eq!(collection, Collection::Attendance);
                assert_eq!(id, "x");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
