// src/store/memory.rs

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{StoreError, StudentStore};
use crate::models::student::{NewStudent, StudentRecord};

#[derive(Default)]
struct Inner {
    next_id: i64,
    students: Vec<StudentRecord>,
    /// Lowercased names, including soft-deleted students.
    taken_names: HashSet<String>,
}

/// Process-local `StudentStore`.
///
/// Mirrors the Postgres store's behaviour: names are unique case-insensitively,
/// soft-deleted names stay taken. `set_available(false)` simulates an outage.
pub struct InMemoryStudentStore {
    inner: Mutex<Inner>,
    available: AtomicBool,
    create_calls: AtomicUsize,
}

impl InMemoryStudentStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                next_id: 1,
                ..Default::default()
            }),
            available: AtomicBool::new(true),
            create_calls: AtomicUsize::new(0),
        }
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Number of `create_student` calls received, successful or not.
    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    fn ensure_available(&self) -> Result<(), StoreError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::Unavailable("in-memory store is offline".to_string()))
        }
    }
}

impl Default for InMemoryStudentStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StudentStore for InMemoryStudentStore {
    async fn create_student(&self, student: NewStudent) -> Result<StudentRecord, StoreError> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        self.ensure_available()?;

        let mut inner = self.inner.lock().await;
        if !inner.taken_names.insert(student.name.to_lowercase()) {
            return Err(StoreError::Duplicate(format!(
                "Student '{}' already exists",
                student.name
            )));
        }

        let id = inner.next_id;
        inner.next_id += 1;

        let record = StudentRecord {
            id,
            user_id: id,
            name: student.name,
            points: 0,
            streak: 0,
            created_at: chrono::Utc::now(),
            teacher_id: student.teacher_id,
            deleted_at: None,
        };
        inner.students.push(record.clone());

        Ok(record)
    }

    async fn list_active_students(
        &self,
        teacher_id: Option<i64>,
    ) -> Result<Vec<StudentRecord>, StoreError> {
        self.ensure_available()?;

        let inner = self.inner.lock().await;
        Ok(inner
            .students
            .iter()
            .filter(|s| s.is_active())
            .filter(|s| teacher_id.is_none() || s.teacher_id == teacher_id)
            .cloned()
            .collect())
    }

    async fn soft_delete_student(&self, id: i64) -> Result<bool, StoreError> {
        self.ensure_available()?;

        let mut inner = self.inner.lock().await;
        match inner.students.iter_mut().find(|s| s.id == id && s.is_active()) {
            Some(student) => {
                student.deleted_at = Some(chrono::Utc::now());
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_student(name: &str, teacher_id: Option<i64>) -> NewStudent {
        NewStudent {
            name: name.to_string(),
            password_hash: "hash".to_string(),
            teacher_id,
        }
    }

    #[tokio::test]
    async fn test_duplicate_names_are_rejected_case_insensitively() {
        let store = InMemoryStudentStore::new();
        store.create_student(new_student("Mia", None)).await.unwrap();

        let err = store.create_student(new_student("mia", None)).await.unwrap_err();
        assert!(matches!(err, StoreError::Duplicate(_)));
        assert_eq!(store.create_calls(), 2);
    }

    #[tokio::test]
    async fn test_soft_deleted_students_leave_active_listing() {
        let store = InMemoryStudentStore::new();
        let a = store.create_student(new_student("Ann", Some(7))).await.unwrap();
        store.create_student(new_student("Ben", Some(7))).await.unwrap();
        store.create_student(new_student("Cal", None)).await.unwrap();

        assert!(store.soft_delete_student(a.id).await.unwrap());
        assert!(!store.soft_delete_student(a.id).await.unwrap());

        let active: Vec<String> = store
            .list_active_students(None)
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.name)
            .collect();
        assert_eq!(active, vec!["Ben", "Cal"]);

        let of_teacher = store.list_active_students(Some(7)).await.unwrap();
        assert_eq!(of_teacher.len(), 1);
        assert_eq!(of_teacher[0].name, "Ben");

        // The name stays taken for audit purposes.
        let err = store.create_student(new_student("Ann", None)).await.unwrap_err();
        assert!(matches!(err, StoreError::Duplicate(_)));
    }

    #[tokio::test]
    async fn test_offline_store_reports_unavailable() {
        let store = InMemoryStudentStore::new();
        store.set_available(false);

        let err = store.create_student(new_student("Ann", None)).await.unwrap_err();
        assert!(err.is_unavailable());
        assert!(store.list_active_students(None).await.unwrap_err().is_unavailable());
    }
}
