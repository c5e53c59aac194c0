use async_trait::async_trait;
use chrono::{DateTime, Utc};
use speech_core::model::ExerciseId;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Persisted shape of a completed exercise.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionRecord {
    pub exercise_id: ExerciseId,
    pub completed_at: DateTime<Utc>,
}

impl CompletionRecord {
    #[must_use]
    pub fn new(exercise_id: ExerciseId, completed_at: DateTime<Utc>) -> Self {
        Self {
            exercise_id,
            completed_at,
        }
    }
}

/// Repository contract for exercise completions.
///
/// Completions form a set: recording an exercise that is already stored keeps
/// the first record and reports `false`.
#[async_trait]
pub trait CompletionRepository: Send + Sync {
    /// Store a completion unless one already exists for the exercise.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the record cannot be stored.
    async fn record_completion(&self, record: &CompletionRecord) -> Result<bool, StorageError>;

    /// All stored completions, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the records cannot be read.
    async fn list_completions(&self) -> Result<Vec<CompletionRecord>, StorageError>;

    /// Fetch the completion for one exercise.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the exercise was never completed.
    async fn get_completion(&self, id: &ExerciseId) -> Result<CompletionRecord, StorageError>;
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    completions: Arc<Mutex<BTreeMap<ExerciseId, DateTime<Utc>>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CompletionRepository for InMemoryRepository {
    async fn record_completion(&self, record: &CompletionRecord) -> Result<bool, StorageError> {
        let mut guard = self
            .completions
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        if guard.contains_key(&record.exercise_id) {
            return Ok(false);
        }
        guard.insert(record.exercise_id.clone(), record.completed_at);
        Ok(true)
    }

    async fn list_completions(&self) -> Result<Vec<CompletionRecord>, StorageError> {
        let guard = self
            .completions
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let mut records: Vec<CompletionRecord> = guard
            .iter()
            .map(|(id, at)| CompletionRecord::new(id.clone(), *at))
            .collect();
        records.sort_by(|a, b| {
            a.completed_at
                .cmp(&b.completed_at)
                .then_with(|| a.exercise_id.cmp(&b.exercise_id))
        });
        Ok(records)
    }

    async fn get_completion(&self, id: &ExerciseId) -> Result<CompletionRecord, StorageError> {
        let guard = self
            .completions
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard
            .get(id)
            .map(|at| CompletionRecord::new(id.clone(), *at))
            .ok_or(StorageError::NotFound)
    }
}

/// Repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub completions: Arc<dyn CompletionRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let completions: Arc<dyn CompletionRepository> = Arc::new(InMemoryRepository::new());
        Self { completions }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use speech_core::time::fixed_now;

    #[tokio::test]
    async fn recording_twice_keeps_first_completion() {
        let repo = InMemoryRepository::new();
        let id = ExerciseId::new("vowel-sounds");
        let first = CompletionRecord::new(id.clone(), fixed_now());
        let again = CompletionRecord::new(id.clone(), fixed_now() + chrono::Duration::days(1));

        assert!(repo.record_completion(&first).await.unwrap());
        assert!(!repo.record_completion(&again).await.unwrap());

        let stored = repo.get_completion(&id).await.unwrap();
        assert_eq!(stored, first);
        assert_eq!(repo.list_completions().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn list_is_ordered_by_completion_time() {
        let repo = InMemoryRepository::new();
        let later = CompletionRecord::new(
            ExerciseId::new("a-later"),
            fixed_now() + chrono::Duration::minutes(5),
        );
        let earlier = CompletionRecord::new(ExerciseId::new("z-earlier"), fixed_now());
        repo.record_completion(&later).await.unwrap();
        repo.record_completion(&earlier).await.unwrap();

        let listed = repo.list_completions().await.unwrap();
        assert_eq!(listed, vec![earlier, later]);
    }

    #[tokio::test]
    async fn missing_completion_is_not_found() {
        let storage = Storage::in_memory();
        let err = storage
            .completions
            .get_completion(&ExerciseId::new("nope"))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::NotFound));
    }
}
