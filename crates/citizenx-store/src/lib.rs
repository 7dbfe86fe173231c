//! Persistence for CitizenX: repositories over the relational store and the object
//! store that holds uploaded images.
//!
//! Each repository is a trait so the HTTP layer can run against either backend:
//!
//! * [`PgStore`] talks to PostgreSQL through `sqlx`. Single-record operations use plain
//!   statements, dashboard aggregations use hand-written SQL.
//! * [`MemoryStore`] keeps every table in process behind one lock. It is used by tests
//!   and for running the server without a database.
//!
//! Object storage follows the same split with [`S3ObjectStore`] and
//! [`MemoryObjectStore`].

#![forbid(unsafe_code)]

pub mod error;
pub mod memory;
pub mod object;
pub mod postgres;
pub mod posts;
pub mod reports;
pub mod users;

pub use crate::error::StoreError;
pub use crate::memory::MemoryStore;
pub use crate::object::memory::MemoryObjectStore;
#[cfg(feature = "s3")]
pub use crate::object::s3::S3ObjectStore;
pub use crate::object::{ObjectStore, detect_content_type, object_key, public_url};
pub use crate::postgres::PgStore;
pub use crate::posts::PostRepository;
pub use crate::reports::IncidentReportRepository;
pub use crate::users::UserRepository;
