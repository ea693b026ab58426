//! # Storage Module
//!
//! Durable, keyed storage for the five record collections (routes, stops,
//! students, attendance, incidents).
//!
//! The domain layer talks to storage only through the [`RecordStore`] trait.
//! Collections are selected with the closed [`Collection`] enum and items are
//! typed [`Record`] variants, so there is no string-keyed access anywhere.
//!
//! ## Guarantees
//!
//! - **Insertion order**: `get_all` returns rows in the order they were first
//!   inserted; overwriting a record keeps its position
//! - **Upsert**: `put` inserts when the id is new and fully replaces otherwise
//! - **Idempotent delete**: deleting a missing id is not an error
//! - **Single-collection atomicity**: each write commits to one collection;
//!   there are no cross-collection transactions
//! - **Secondary lookups**: attendance by date and by student are indexed
//!
//! ## Current Implementation
//!
//! - SQLite through SQLx (`DbConnection`), one table per collection

pub mod connection;
pub mod error;
pub mod record_store;
pub mod traits;

pub use connection::DbConnection;
pub use error::{StoreError, StoreResult};
pub use traits::{Collection, Entity, Record, RecordStore};
