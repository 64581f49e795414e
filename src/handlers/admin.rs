// src/handlers/admin.rs

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;

use crate::{
    config::Config,
    enrollment::BatchEnrollmentPipeline,
    error::AppError,
    models::{question::GeneratedQuestion, student::StudentCreationRequest},
    store::StudentStore,
    validation::QuestionValidator,
};

/// DTO for validating one generated question.
#[derive(Debug, Deserialize)]
pub struct ValidateQuestionRequest {
    pub question: GeneratedQuestion,
    /// Activates the unit-specific rules when it names a known unit.
    #[serde(default)]
    pub unit_name: Option<String>,
}

/// Validates a single generated question.
/// Invalid questions still answer 200; the verdict is in the body.
pub async fn validate_question(
    State(validator): State<Arc<QuestionValidator>>,
    Json(payload): Json<ValidateQuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    let result = validator.validate(&payload.question, payload.unit_name.as_deref());
    if let Some(reason) = &result.reason {
        tracing::warn!(
            "Rejected generated question for unit {}: {}",
            payload.question.unit_id,
            reason
        );
    }

    Ok(Json(result))
}

/// DTO for validating a generator batch.
#[derive(Debug, Deserialize)]
pub struct ValidateQuestionBatchRequest {
    pub questions: Vec<GeneratedQuestion>,
    #[serde(default)]
    pub unit_name: Option<String>,
}

/// Validates every question of a batch independently.
pub async fn validate_question_batch(
    State(validator): State<Arc<QuestionValidator>>,
    Json(payload): Json<ValidateQuestionBatchRequest>,
) -> Result<impl IntoResponse, AppError> {
    let report = validator.validate_batch(&payload.questions, payload.unit_name.as_deref());
    Ok(Json(report))
}

/// DTO for a batch of students to enroll.
#[derive(Debug, Deserialize)]
pub struct EnrollStudentsRequest {
    pub students: Vec<StudentCreationRequest>,
    /// Teacher applied to every student that does not name one.
    #[serde(default)]
    pub teacher_id: Option<i64>,
}

/// Creates a batch of students.
///
/// * Every student is attempted on its own; rejections are listed in the body.
/// * Returns 503 only when the store cannot be reached; retry the whole batch then.
pub async fn enroll_students(
    State(pipeline): State<Arc<BatchEnrollmentPipeline>>,
    State(config): State<Config>,
    Json(payload): Json<EnrollStudentsRequest>,
) -> Result<impl IntoResponse, AppError> {
    if payload.students.len() > config.max_enrollment_batch {
        return Err(AppError::BadRequest(format!(
            "Batch has {} students, at most {} allowed per request",
            payload.students.len(),
            config.max_enrollment_batch
        )));
    }

    let default_teacher = payload.teacher_id;
    let requests: Vec<StudentCreationRequest> = payload
        .students
        .into_iter()
        .map(|mut student| {
            student.teacher_id = student.teacher_id.or(default_teacher);
            student
        })
        .collect();

    let result = pipeline.enroll(requests).await?;

    Ok((StatusCode::OK, Json(result)))
}

#[derive(Debug, Deserialize)]
pub struct ListStudentsParams {
    pub teacher_id: Option<i64>,
}

/// Lists active (not soft-deleted) students, optionally for one teacher.
pub async fn list_students(
    State(store): State<Arc<dyn StudentStore>>,
    Query(params): Query<ListStudentsParams>,
) -> Result<impl IntoResponse, AppError> {
    let students = store.list_active_students(params.teacher_id).await?;
    Ok(Json(students))
}

/// Soft deletes a student by ID. The row is kept for audit.
pub async fn delete_student(
    State(store): State<Arc<dyn StudentStore>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    if !store.soft_delete_student(id).await? {
        return Err(AppError::NotFound("Student not found".to_string()));
    }

    tracing::info!("Student {} soft deleted", id);
    Ok(StatusCode::NO_CONTENT)
}
