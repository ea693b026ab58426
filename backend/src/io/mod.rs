//! Edges of the application: the REST API and backup delivery.

pub mod backup;
pub mod rest;
