// src/enrollment.rs

//! Batch creation of student accounts with per-item partial failure.
//!
//! Each request walks `shape check -> persist` on its own. Rejected items turn
//! into `FailedStudent` entries and never stop the rest of the batch. Only an
//! unreachable store fails the whole call.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use validator::{Validate, ValidationError};

use crate::{
    models::student::{
        BatchEnrollmentResult, EnrollmentOutcome, FailedStudent, FailureKind, NewStudent,
        StudentCreationRequest,
    },
    store::{StoreError, StudentStore},
    utils::hash::hash_password,
};

/// Failures that abort a whole batch instead of a single item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnrollmentError {
    /// The store could not be reached; the caller should retry later.
    StoreUnavailable(String),
    /// A worker task panicked or could not hash a credential.
    TaskFailed(String),
}

impl fmt::Display for EnrollmentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnrollmentError::StoreUnavailable(msg) => write!(f, "student store unavailable: {}", msg),
            EnrollmentError::TaskFailed(msg) => write!(f, "enrollment task failed: {}", msg),
        }
    }
}

impl std::error::Error for EnrollmentError {}

pub struct BatchEnrollmentPipeline {
    store: Arc<dyn StudentStore>,
    concurrency: usize,
}

impl BatchEnrollmentPipeline {
    /// Sequential pipeline over `store`.
    pub fn new(store: Arc<dyn StudentStore>) -> Self {
        Self {
            store,
            concurrency: 1,
        }
    }

    /// Allows up to `concurrency` items to be persisted at the same time.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Attempts every request independently and reports both outcomes in
    /// input order.
    ///
    /// Within one batch only the first valid occurrence of a name is
    /// attempted; later ones fail as `DuplicateInBatch`. Nothing is retried.
    /// Resubmitting the same batch is not idempotent: already created names
    /// come back as `DuplicateName` failures.
    pub async fn enroll(
        &self,
        requests: Vec<StudentCreationRequest>,
    ) -> Result<BatchEnrollmentResult, EnrollmentError> {
        if requests.is_empty() {
            return Ok(BatchEnrollmentResult::default());
        }

        let total = requests.len();
        tracing::info!(
            "Enrolling batch of {} students (concurrency {})",
            total,
            self.concurrency
        );

        // One slot per input item, filled by position rather than completion order.
        let mut slots: Vec<Option<EnrollmentOutcome>> = vec![None; total];
        let mut seen_names = HashSet::new();
        let mut pending = Vec::new();

        for (index, request) in requests.into_iter().enumerate() {
            match precheck(&request, &mut seen_names) {
                Some(failure) => slots[index] = Some(EnrollmentOutcome::Failed(failure)),
                None => pending.push((index, request)),
            }
        }

        if self.concurrency == 1 {
            for (index, request) in pending {
                slots[index] = Some(create_one(self.store.as_ref(), request).await?);
            }
        } else {
            self.persist_concurrently(pending, &mut slots).await?;
        }

        let outcomes = slots
            .into_iter()
            .enumerate()
            .map(|(index, slot)| {
                slot.ok_or_else(|| {
                    EnrollmentError::TaskFailed(format!("item {} produced no outcome", index))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let result = BatchEnrollmentResult::from_outcomes(outcomes);
        for failure in result.failed_students() {
            tracing::warn!(
                "Student '{}' not enrolled ({:?}): {}",
                failure.name,
                failure.kind,
                failure.reason
            );
        }
        tracing::info!(
            "Enrollment finished: {} created, {} failed",
            result.success_count(),
            result.failure_count()
        );

        Ok(result)
    }

    async fn persist_concurrently(
        &self,
        pending: Vec<(usize, StudentCreationRequest)>,
        slots: &mut [Option<EnrollmentOutcome>],
    ) -> Result<(), EnrollmentError> {
        let permits = Arc::new(Semaphore::new(self.concurrency));
        let mut tasks = JoinSet::new();

        for (index, request) in pending {
            let store = Arc::clone(&self.store);
            let permits = Arc::clone(&permits);
            tasks.spawn(async move {
                let _permit = permits
                    .acquire_owned()
                    .await
                    .map_err(|e| EnrollmentError::TaskFailed(e.to_string()))?;
                let outcome = create_one(store.as_ref(), request).await?;
                Ok::<_, EnrollmentError>((index, outcome))
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Ok((index, outcome))) => slots[index] = Some(outcome),
                Ok(Err(err)) => {
                    // In-flight creations are dropped; each one is atomic in the store.
                    tasks.abort_all();
                    return Err(err);
                }
                Err(join_err) => {
                    tasks.abort_all();
                    return Err(EnrollmentError::TaskFailed(join_err.to_string()));
                }
            }
        }

        Ok(())
    }
}

/// Shape checks and in-batch duplicate detection. Runs before any persistence.
fn precheck(
    request: &StudentCreationRequest,
    seen_names: &mut HashSet<String>,
) -> Option<FailedStudent> {
    if let Err(errors) = request.validate() {
        let fields = errors.field_errors();
        let (kind, field) = if fields.contains_key("name") {
            (FailureKind::InvalidName, "name")
        } else {
            (FailureKind::InvalidCredential, "password")
        };
        let reason = fields
            .get(field)
            .and_then(|errs| errs.first())
            .map(describe)
            .unwrap_or_else(|| errors.to_string());

        return Some(FailedStudent {
            name: request.name.clone(),
            kind,
            reason,
        });
    }

    if !seen_names.insert(request.name.to_lowercase()) {
        return Some(FailedStudent {
            name: request.name.clone(),
            kind: FailureKind::DuplicateInBatch,
            reason: format!("Name '{}' appears earlier in this batch", request.name),
        });
    }

    None
}

fn describe(error: &ValidationError) -> String {
    error
        .message
        .as_ref()
        .map(|m| m.to_string())
        .unwrap_or_else(|| error.code.to_string())
}

/// Persists one valid request. Item-level store failures become `Failed`
/// outcomes; unavailability aborts the batch.
async fn create_one(
    store: &dyn StudentStore,
    request: StudentCreationRequest,
) -> Result<EnrollmentOutcome, EnrollmentError> {
    let StudentCreationRequest {
        name,
        password,
        teacher_id,
    } = request;

    let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| EnrollmentError::TaskFailed(e.to_string()))?
        .map_err(|e| EnrollmentError::TaskFailed(format!("could not hash credential: {}", e)))?;

    let new_student = NewStudent {
        name: name.clone(),
        password_hash,
        teacher_id,
    };

    match store.create_student(new_student).await {
        Ok(record) => Ok(EnrollmentOutcome::Created(record)),
        Err(StoreError::Duplicate(reason)) => Ok(EnrollmentOutcome::Failed(FailedStudent {
            name,
            kind: FailureKind::DuplicateName,
            reason,
        })),
        Err(StoreError::Constraint(reason)) => Ok(EnrollmentOutcome::Failed(FailedStudent {
            name,
            kind: FailureKind::ConstraintViolation,
            reason,
        })),
        Err(StoreError::Unavailable(reason)) => {
            tracing::error!("Aborting enrollment batch, store unavailable: {}", reason);
            Err(EnrollmentError::StoreUnavailable(reason))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::student::StudentRecord;
    use crate::store::InMemoryStudentStore;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Lets creations finish strictly in reverse input order: the item named
    /// "Student N" waits until every item after it has been stored.
    struct ReverseCompletionStore {
        inner: InMemoryStudentStore,
        next_to_finish: AtomicUsize,
    }

    impl ReverseCompletionStore {
        fn new(batch_len: usize) -> Self {
            Self {
                inner: InMemoryStudentStore::new(),
                next_to_finish: AtomicUsize::new(batch_len - 1),
            }
        }
    }

    #[async_trait]
    impl StudentStore for ReverseCompletionStore {
        async fn create_student(&self, student: NewStudent) -> Result<StudentRecord, StoreError> {
            let position: usize = student
                .name
                .rsplit(' ')
                .next()
                .and_then(|n| n.parse().ok())
                .expect("numbered student name");
            while self.next_to_finish.load(Ordering::SeqCst) != position {
                tokio::time::sleep(Duration::from_millis(2)).await;
            }
            let record = self.inner.create_student(student).await;
            self.next_to_finish.fetch_sub(1, Ordering::SeqCst);
            record
        }

        async fn list_active_students(
            &self,
            teacher_id: Option<i64>,
        ) -> Result<Vec<StudentRecord>, StoreError> {
            self.inner.list_active_students(teacher_id).await
        }

        async fn soft_delete_student(&self, id: i64) -> Result<bool, StoreError> {
            self.inner.soft_delete_student(id).await
        }
    }

    fn pipeline(store: &Arc<InMemoryStudentStore>, concurrency: usize) -> BatchEnrollmentPipeline {
        BatchEnrollmentPipeline::new(store.clone()).with_concurrency(concurrency)
    }

    fn names(result: &BatchEnrollmentResult) -> Vec<&str> {
        result.created_students().iter().map(|s| s.name.as_str()).collect()
    }

    #[tokio::test]
    async fn test_empty_batch_makes_no_store_call() {
        let store = Arc::new(InMemoryStudentStore::new());
        let result = pipeline(&store, 1).enroll(Vec::new()).await.unwrap();

        assert_eq!(result.success_count(), 0);
        assert_eq!(result.failure_count(), 0);
        assert_eq!(store.create_calls(), 0);
    }

    #[tokio::test]
    async fn test_existing_duplicate_does_not_block_the_rest() {
        let store = Arc::new(InMemoryStudentStore::new());
        pipeline(&store, 1)
            .enroll(vec![StudentCreationRequest::new("Taken", "secret1")])
            .await
            .unwrap();

        let result = pipeline(&store, 1)
            .enroll(vec![
                StudentCreationRequest::new("Alice", "secret1"),
                StudentCreationRequest::new("Taken", "secret2"),
                StudentCreationRequest::new("Bob", "secret3"),
            ])
            .await
            .unwrap();

        assert_eq!(names(&result), vec!["Alice", "Bob"]);
        assert_eq!(result.failed_students().len(), 1);
        assert_eq!(result.failed_students()[0].name, "Taken");
        assert_eq!(result.failed_students()[0].kind, FailureKind::DuplicateName);
        assert_eq!(result.success_count() + result.failure_count(), 3);
    }

    #[tokio::test]
    async fn test_shape_failures_are_reported_per_item() {
        let store = Arc::new(InMemoryStudentStore::new());
        let result = pipeline(&store, 1)
            .enroll(vec![
                StudentCreationRequest::new("x", "secret1"),
                StudentCreationRequest::new("Carla", "no"),
                StudentCreationRequest::new("Dan", "secret1"),
            ])
            .await
            .unwrap();

        assert_eq!(names(&result), vec!["Dan"]);
        let kinds: Vec<FailureKind> = result.failed_students().iter().map(|f| f.kind).collect();
        assert_eq!(kinds, vec![FailureKind::InvalidName, FailureKind::InvalidCredential]);
        assert_eq!(
            result.failed_students()[1].reason,
            "Password length must be between 4 and 128 characters."
        );
        // Invalid items never reach the store.
        assert_eq!(store.create_calls(), 1);
    }

    #[tokio::test]
    async fn test_in_batch_duplicates_keep_first_occurrence() {
        let store = Arc::new(InMemoryStudentStore::new());
        let result = pipeline(&store, 4)
            .enroll(vec![
                StudentCreationRequest::new("Eve", "bad pass"),
                StudentCreationRequest::new("eve", "secret1"),
                StudentCreationRequest::new("EVE", "secret2"),
            ])
            .await
            .unwrap();

        assert_eq!(names(&result), vec!["eve"]);
        let kinds: Vec<FailureKind> = result.failed_students().iter().map(|f| f.kind).collect();
        assert_eq!(kinds, vec![FailureKind::InvalidCredential, FailureKind::DuplicateInBatch]);
        assert_eq!(store.create_calls(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_enrollment_preserves_input_order() {
        let store = Arc::new(InMemoryStudentStore::new());
        let requests: Vec<StudentCreationRequest> = (0..24)
            .map(|i| StudentCreationRequest::new(format!("Student {:02}", i), "secret1").with_teacher(9))
            .collect();

        let result = pipeline(&store, 8).enroll(requests).await.unwrap();

        let expected: Vec<String> = (0..24).map(|i| format!("Student {:02}", i)).collect();
        assert_eq!(names(&result), expected);
        assert!(result.created_students().iter().all(|s| s.teacher_id == Some(9)));
        assert_eq!(store.list_active_students(Some(9)).await.unwrap().len(), 24);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_results_follow_input_order_when_completion_is_reversed() {
        let store = Arc::new(ReverseCompletionStore::new(4));
        let requests: Vec<StudentCreationRequest> = (0..4)
            .map(|i| StudentCreationRequest::new(format!("Student {}", i), "secret1"))
            .collect();

        let result = tokio::time::timeout(
            Duration::from_secs(30),
            BatchEnrollmentPipeline::new(store.clone()).with_concurrency(4).enroll(requests),
        )
        .await
        .expect("batch finished")
        .unwrap();

        let expected: Vec<String> = (0..4).map(|i| format!("Student {}", i)).collect();
        assert_eq!(names(&result), expected);
        // Ids are handed out at completion time, so the last item was stored first.
        let ids: Vec<i64> = result.created_students().iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![4, 3, 2, 1]);
    }

    #[tokio::test]
    async fn test_store_outage_fails_the_whole_batch() {
        let store = Arc::new(InMemoryStudentStore::new());
        store.set_available(false);

        for concurrency in [1, 4] {
            let err = pipeline(&store, concurrency)
                .enroll(vec![
                    StudentCreationRequest::new("Finn", "secret1"),
                    StudentCreationRequest::new("Gail", "secret1"),
                ])
                .await
                .unwrap_err();
            assert!(matches!(err, EnrollmentError::StoreUnavailable(_)));
        }
    }

    #[tokio::test]
    async fn test_outage_is_not_reported_for_batches_of_invalid_items() {
        let store = Arc::new(InMemoryStudentStore::new());
        store.set_available(false);

        let result = pipeline(&store, 1)
            .enroll(vec![StudentCreationRequest::new("?", "secret1")])
            .await
            .unwrap();
        assert_eq!(result.failure_count(), 1);
        assert_eq!(store.create_calls(), 0);
    }

    #[test]
    fn test_concurrency_is_at_least_one() {
        let store: Arc<dyn StudentStore> = Arc::new(InMemoryStudentStore::new());
        assert_eq!(BatchEnrollmentPipeline::new(store).with_concurrency(0).concurrency(), 1);
    }
}
