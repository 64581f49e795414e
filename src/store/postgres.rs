// src/store/postgres.rs

use async_trait::async_trait;
use sqlx::PgPool;

use super::{StoreError, StudentStore};
use crate::models::student::{NewStudent, StudentRecord};

/// Postgres SQLSTATE for unique constraint violations.
const UNIQUE_VIOLATION: &str = "23505";
/// Class 23 covers every integrity constraint violation.
const INTEGRITY_CLASS: &str = "23";

const STUDENT_COLUMNS: &str =
    "id, user_id, name, points, streak, created_at, teacher_id, deleted_at";

/// `StudentStore` backed by the `users` and `students` tables.
#[derive(Clone)]
pub struct PgStudentStore {
    pool: PgPool,
}

impl PgStudentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl StudentStore for PgStudentStore {
    async fn create_student(&self, student: NewStudent) -> Result<StudentRecord, StoreError> {
        let to_store_error = |e: sqlx::Error| classify_sqlx_error(e, &student.name);

        // The user row and the student row are written together or not at all.
        let mut tx = self.pool.begin().await.map_err(to_store_error)?;

        let user_id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO users (username, password, role)
            VALUES ($1, $2, 'student')
            RETURNING id
            "#,
        )
        .bind(&student.name)
        .bind(&student.password_hash)
        .fetch_one(&mut *tx)
        .await
        .map_err(to_store_error)?;

        let record = sqlx::query_as::<_, StudentRecord>(&format!(
            r#"
            INSERT INTO students (user_id, name, teacher_id)
            VALUES ($1, $2, $3)
            RETURNING {STUDENT_COLUMNS}
            "#
        ))
        .bind(user_id)
        .bind(&student.name)
        .bind(student.teacher_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(to_store_error)?;

        tx.commit().await.map_err(to_store_error)?;

        Ok(record)
    }

    async fn list_active_students(
        &self,
        teacher_id: Option<i64>,
    ) -> Result<Vec<StudentRecord>, StoreError> {
        sqlx::query_as::<_, StudentRecord>(&format!(
            r#"
            SELECT {STUDENT_COLUMNS}
            FROM students
            WHERE deleted_at IS NULL
              AND ($1::BIGINT IS NULL OR teacher_id = $1)
            ORDER BY id
            "#
        ))
        .bind(teacher_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list students: {:?}", e);
            StoreError::Unavailable(e.to_string())
        })
    }

    async fn soft_delete_student(&self, id: i64) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "UPDATE students SET deleted_at = NOW() WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to soft delete student {}: {:?}", id, e);
            StoreError::Unavailable(e.to_string())
        })?;

        Ok(result.rows_affected() > 0)
    }
}

/// Maps a sqlx error raised while creating `name` onto the store taxonomy.
fn classify_sqlx_error(err: sqlx::Error, name: &str) -> StoreError {
    match &err {
        sqlx::Error::Database(db_err) => {
            classify_database_code(db_err.code().as_deref(), name, db_err.message())
        }
        _ => {
            tracing::error!("Student store failure: {:?}", err);
            StoreError::Unavailable(err.to_string())
        }
    }
}

fn classify_database_code(code: Option<&str>, name: &str, message: &str) -> StoreError {
    match code {
        Some(UNIQUE_VIOLATION) => {
            StoreError::Duplicate(format!("Student '{}' already exists", name))
        }
        Some(code) if code.starts_with(INTEGRITY_CLASS) => {
            StoreError::Constraint(format!("Student '{}' rejected by database: {}", name, message))
        }
        _ => {
            tracing::error!("Database error (code {:?}): {}", code, message);
            StoreError::Unavailable(message.to_string())
        }
    }
}
