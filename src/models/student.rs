// src/models/student.rs

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize, Serializer, ser::SerializeStruct};
use sqlx::FromRow;
use validator::Validate;

/// Letters and digits, with inner spaces, dots, apostrophes, dashes and underscores.
static NAME_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[\p{L}\p{N}](?:[\p{L}\p{N} ._'-]*[\p{L}\p{N}])?$").expect("valid name pattern")
});

/// Represents a row of the 'students' table joined with its owning user.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct StudentRecord {
    pub id: i64,

    /// The user account that owns this student profile.
    pub user_id: i64,

    /// Display name, also the unique login name of the owning user.
    pub name: String,

    pub points: i64,
    pub streak: i32,
    pub created_at: chrono::DateTime<chrono::Utc>,

    /// Teacher this student was enrolled by, if any.
    pub teacher_id: Option<i64>,

    /// Soft deletion marker. Deleted students stay in the table for audit
    /// but never show up in active listings.
    pub deleted_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl StudentRecord {
    pub fn is_active(&self) -> bool {
        self.deleted_at.is_none()
    }
}

/// DTO for one student in an enrollment batch.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct StudentCreationRequest {
    #[validate(
        length(min = 2, max = 50, message = "Name length must be between 2 and 50 characters."),
        custom(function = validate_name_shape)
    )]
    pub name: String,
    #[validate(
        length(min = 4, max = 128, message = "Password length must be between 4 and 128 characters."),
        custom(function = validate_credential_shape)
    )]
    pub password: String,
    #[serde(default)]
    pub teacher_id: Option<i64>,
}

impl StudentCreationRequest {
    pub fn new(name: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            password: password.into(),
            teacher_id: None,
        }
    }

    pub fn with_teacher(mut self, teacher_id: i64) -> Self {
        self.teacher_id = Some(teacher_id);
        self
    }
}

fn validate_name_shape(name: &str) -> Result<(), validator::ValidationError> {
    if !NAME_PATTERN.is_match(name) {
        return Err(shape_error(
            "invalid_name_characters",
            "Name may only contain letters, digits, spaces and . _ ' -",
        ));
    }
    Ok(())
}

fn validate_credential_shape(password: &str) -> Result<(), validator::ValidationError> {
    if password.chars().any(char::is_whitespace) {
        return Err(shape_error(
            "credential_whitespace",
            "Password must not contain whitespace.",
        ));
    }
    if password.chars().any(char::is_control) {
        return Err(shape_error(
            "credential_control_chars",
            "Password must not contain control characters.",
        ));
    }
    Ok(())
}

fn shape_error(code: &'static str, message: &'static str) -> validator::ValidationError {
    let mut error = validator::ValidationError::new(code);
    error.message = Some(message.into());
    error
}

/// What the storage collaborator receives for one student.
/// The credential is already hashed at this point.
#[derive(Debug, Clone)]
pub struct NewStudent {
    pub name: String,
    pub password_hash: String,
    pub teacher_id: Option<i64>,
}

/// Why a single batch item was not created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    InvalidName,
    InvalidCredential,
    /// Same name appeared earlier in the same batch.
    DuplicateInBatch,
    /// A student or user with this name already exists.
    DuplicateName,
    ConstraintViolation,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedStudent {
    /// Name as submitted.
    pub name: String,
    pub kind: FailureKind,
    pub reason: String,
}

/// Terminal state of one batch item.
#[derive(Debug, Clone, PartialEq)]
pub enum EnrollmentOutcome {
    Created(StudentRecord),
    Failed(FailedStudent),
}

/// Aggregate outcome of one enrollment batch.
///
/// Built once from the ordered per-item outcomes. Counts are computed from the
/// lists so they can never drift apart.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchEnrollmentResult {
    created_students: Vec<StudentRecord>,
    failed_students: Vec<FailedStudent>,
}

impl BatchEnrollmentResult {
    pub fn from_outcomes(outcomes: impl IntoIterator<Item = EnrollmentOutcome>) -> Self {
        let mut result = Self::default();
        for outcome in outcomes {
            match outcome {
                EnrollmentOutcome::Created(record) => result.created_students.push(record),
                EnrollmentOutcome::Failed(failure) => result.failed_students.push(failure),
            }
        }
        result
    }

    pub fn created_students(&self) -> &[StudentRecord] {
        &self.created_students
    }

    pub fn failed_students(&self) -> &[FailedStudent] {
        &self.failed_students
    }

    pub fn success_count(&self) -> usize {
        self.created_students.len()
    }

    pub fn failure_count(&self) -> usize {
        self.failed_students.len()
    }

    pub fn total(&self) -> usize {
        self.success_count() + self.failure_count()
    }

    /// Names to resubmit after fixing them. Only the failed subset should be
    /// sent again; a full resubmission fails every already created name as a
    /// duplicate.
    pub fn failed_names(&self) -> Vec<&str> {
        self.failed_students.iter().map(|f| f.name.as_str()).collect()
    }
}

impl Serialize for BatchEnrollmentResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("BatchEnrollmentResult", 4)?;
        state.serialize_field("created_students", &self.created_students)?;
        state.serialize_field("failed_students", &self.failed_students)?;
        state.serialize_field("success_count", &self.success_count())?;
        state.serialize_field("failure_count", &self.failure_count())?;
        state.end()
    }
}
