//! Routes, stops and students: create, edit, bulk-add and delete.
use anyhow::Result;
use shared::{Route, Stop, Student};
use tracing::info;
use uuid::Uuid;

use crate::domain::bulk_entry::split_bulk_names;
use crate::domain::commands::roster::{
    BulkAddStopsCommand, BulkAddStudentsCommand, EditStopCommand, EditStudentCommand,
    SaveRouteCommand,
};
use crate::domain::school_repository::SchoolRepository;

#[derive(Clone)]
pub struct RosterService {
    repository: SchoolRepository,
}

impl RosterService {
    pub fn new(repository: SchoolRepository) -> Self {
        Self { repository }
    }

    pub async fn list_routes(&self) -> Result<Vec<Route>> {
        Ok(self.repository.list_routes().await?)
    }

    /// Create a route, or fully replace the one named by `command.id`
    pub async fn save_route(&self, command: SaveRouteCommand) -> Result<Route> {
        let route = Route {
            id: command.id.unwrap_or_else(|| Uuid::new_v4().to_string()),
            name: command.name,
            description: command.description,
        };
        self.repository.save_route(route.clone()).await?;
        info!("Saved route {} ({})", route.id, route.name);
        Ok(route)
    }

    pub async fn delete_route(&self, route_id: &str) -> Result<bool> {
        let deleted = self.repository.delete_route(route_id).await?;
        info!("Delete route {}: existed={}", route_id, deleted);
        Ok(deleted)
    }

    pub async fn list_stops(&self) -> Result<Vec<Stop>> {
        Ok(self.repository.list_stops().await?)
    }

    pub async fn stops_for_route(&self, route_id: &str) -> Result<Vec<Stop>> {
        Ok(self.repository.stops_for_route(route_id).await?)
    }

    /// One new stop per name. Orders continue from the size of the whole stop
    /// collection, so they can repeat values left behind by deleted stops.
    pub async fn bulk_add_stops(&self, command: BulkAddStopsCommand) -> Result<Vec<Stop>> {
        let names = split_bulk_names(&command.names_input);
        let base = self.repository.stop_count().await? as u32;

        let mut created = Vec::with_capacity(names.len());
        for (index, name) in names.into_iter().enumerate() {
            let stop = Stop {
                id: Uuid::new_v4().to_string(),
                route_id: command.route_id.clone(),
                name,
                order: base + index as u32,
            };
            self.repository.save_stop(stop.clone()).await?;
            created.push(stop);
        }

        info!("Added {} stops to route {}", created.len(), command.route_id);
        Ok(created)
    }

    /// Replace one stop, keeping its current order (0 when it no longer exists)
    pub async fn edit_stop(&self, command: EditStopCommand) -> Result<Stop> {
        let order = self
            .repository
            .list_stops()
            .await?
            .into_iter()
            .find(|stop| stop.id == command.stop_id)
            .map(|stop| stop.order)
            .unwrap_or(0);

        let stop = Stop {
            id: command.stop_id,
            route_id: command.route_id,
            name: command.name,
            order,
        };
        self.repository.save_stop(stop.clone()).await?;
        info!("Edited stop {}", stop.id);
        Ok(stop)
    }

    pub async fn delete_stop(&self, stop_id: &str) -> Result<bool> {
        let deleted = self.repository.delete_stop(stop_id).await?;
        info!("Delete stop {}: existed={}", stop_id, deleted);
        Ok(deleted)
    }

    pub async fn list_students(&self) -> Result<Vec<Student>> {
        Ok(self.repository.list_students().await?)
    }

    pub async fn bulk_add_students(&self, command: BulkAddStudentsCommand) -> Result<Vec<Student>> {
        let names = split_bulk_names(&command.names_input);

        let mut created = Vec::with_capacity(names.len());
        for name in names {
            let student = Student {
                id: Uuid::new_v4().to_string(),
                stop_id: command.stop_id.clone(),
                name,
                active: true,
                guardian_name: None,
                contact: None,
            };
            self.repository.save_student(student.clone()).await?;
            created.push(student);
        }

        info!("Added {} students to stop {}", created.len(), command.stop_id);
        Ok(created)
    }

    pub async fn edit_student(&self, command: EditStudentCommand) -> Result<Student> {
        let student = Student {
            id: command.student_id,
            stop_id: command.stop_id,
            name: command.name,
            active: command.active,
            guardian_name: command.guardian_name,
            contact: command.contact,
        };
        self.repository.save_student(student.clone()).await?;
        info!("Edited student {}", student.id);
        Ok(student)
    }

    pub async fn delete_student(&self, student_id: &str) -> Result<bool> {
        let deleted = self.repository.delete_student(student_id).await?;
        info!("Delete student {}: existed={}", student_id, deleted);
        Ok(deleted)
    }
}
