// src/store/mod.rs

//! Persistence contract for student accounts.
//!
//! The enrollment pipeline only talks to a `StudentStore`. The binary wires in
//! the Postgres implementation; tests use the in-memory one.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use std::fmt;

use crate::models::student::{NewStudent, StudentRecord};

pub use memory::InMemoryStudentStore;
pub use postgres::PgStudentStore;

/// Failure reported by a storage collaborator.
///
/// `Duplicate` and `Constraint` concern a single record. `Unavailable` means
/// the storage layer itself could not serve the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    Duplicate(String),
    Constraint(String),
    Unavailable(String),
}

impl StoreError {
    pub fn is_unavailable(&self) -> bool {
        matches!(self, StoreError::Unavailable(_))
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Duplicate(msg) => write!(f, "duplicate: {}", msg),
            StoreError::Constraint(msg) => write!(f, "constraint violation: {}", msg),
            StoreError::Unavailable(msg) => write!(f, "storage unavailable: {}", msg),
        }
    }
}

impl std::error::Error for StoreError {}

#[async_trait]
pub trait StudentStore: Send + Sync {
    /// Creates the student and its owning user atomically.
    /// Either a fully populated record comes back or nothing was written.
    async fn create_student(&self, student: NewStudent) -> Result<StudentRecord, StoreError>;

    /// Students without a deletion marker, ordered by id.
    /// `teacher_id` narrows the listing to one teacher's students.
    async fn list_active_students(
        &self,
        teacher_id: Option<i64>,
    ) -> Result<Vec<StudentRecord>, StoreError>;

    /// Sets `deleted_at` on an active student. Returns false when no active
    /// student has this id.
    async fn soft_delete_student(&self, id: i64) -> Result<bool, StoreError>;
}
