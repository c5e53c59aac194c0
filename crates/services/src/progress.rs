use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde::Serialize;

use speech_core::catalog::Catalog;
use speech_core::model::{CategoryId, Exercise, ExerciseId, ProgressRecord, percent};
use storage::repository::{CompletionRecord, CompletionRepository};

use crate::error::ProgressError;

/// Returned by the `advance` that finishes an exercise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExerciseCompletion {
    pub exercise_id: ExerciseId,
    pub points: u32,
    pub completed_at: DateTime<Utc>,
    /// `false` when the exercise had already been completed in this run.
    pub first_completion: bool,
}

/// Completion figures for one category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryProgress {
    pub category_id: CategoryId,
    pub name: String,
    pub completed: usize,
    pub total: usize,
    pub percent: u8,
}

/// Process-wide record of completed exercises.
///
/// Cloning shares the underlying record, so the session machine and the
/// UI shell read and write the same set.
#[derive(Debug, Clone)]
pub struct ProgressTracker {
    catalog: Arc<Catalog>,
    record: Arc<Mutex<ProgressRecord>>,
}

impl ProgressTracker {
    /// Empty tracker over `catalog`.
    #[must_use]
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self {
            catalog,
            record: Arc::new(Mutex::new(ProgressRecord::new())),
        }
    }

    /// Tracker pre-filled with the completions stored in `repo`.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::Storage` if the completions cannot be read.
    pub async fn restore(
        catalog: Arc<Catalog>,
        repo: &dyn CompletionRepository,
    ) -> Result<Self, ProgressError> {
        let tracker = Self::new(catalog);
        let records = repo.list_completions().await?;
        let restored = records.len();
        {
            let mut record = tracker.lock();
            for CompletionRecord {
                exercise_id,
                completed_at,
            } in records
            {
                record.mark_completed(exercise_id, completed_at);
            }
        }
        tracing::debug!(restored, "progress restored from storage");
        Ok(tracker)
    }

    fn lock(&self) -> MutexGuard<'_, ProgressRecord> {
        self.record.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[must_use]
    pub fn catalog(&self) -> Arc<Catalog> {
        Arc::clone(&self.catalog)
    }

    /// Adds `id` to the completed set; returns `true` only the first time.
    pub fn mark_completed(&self, id: ExerciseId, at: DateTime<Utc>) -> bool {
        self.lock().mark_completed(id, at)
    }

    /// Marks `exercise` completed and describes the completion.
    pub fn record_completion(&self, exercise: &Exercise, at: DateTime<Utc>) -> ExerciseCompletion {
        let first_completion = self.mark_completed(exercise.id().clone(), at);
        ExerciseCompletion {
            exercise_id: exercise.id().clone(),
            points: exercise.points(),
            completed_at: at,
            first_completion,
        }
    }

    #[must_use]
    pub fn is_completed(&self, id: &ExerciseId) -> bool {
        self.lock().is_completed(id)
    }

    /// Whole percentage of the category's exercises that are completed.
    ///
    /// `0` for an unknown category or one without exercises.
    #[must_use]
    pub fn category_progress(&self, id: &CategoryId) -> u8 {
        let record = self.lock();
        record.completion_percent(self.catalog.exercises_in_category(id).map(Exercise::id))
    }

    #[must_use]
    pub fn completed_count(&self) -> usize {
        self.lock().len()
    }

    /// Sum of points over completed exercises still present in the catalog.
    #[must_use]
    pub fn total_points(&self) -> u32 {
        let record = self.lock();
        record
            .completed_ids()
            .filter_map(|id| self.catalog.get_exercise(id))
            .map(Exercise::points)
            .sum()
    }

    /// One entry per category, in catalog order.
    #[must_use]
    pub fn category_summaries(&self) -> Vec<CategoryProgress> {
        let record = self.lock();
        self.catalog
            .list_categories()
            .iter()
            .map(|category| {
                let mut total = 0;
                let mut completed = 0;
                for exercise in self.catalog.exercises_in_category(category.id()) {
                    total += 1;
                    if record.is_completed(exercise.id()) {
                        completed += 1;
                    }
                }
                CategoryProgress {
                    category_id: category.id().clone(),
                    name: category.name().to_owned(),
                    completed,
                    total,
                    percent: percent(completed, total),
                }
            })
            .collect()
    }

    #[must_use]
    pub fn snapshot(&self) -> ProgressRecord {
        self.lock().clone()
    }

    /// Writes `completion` to `repo`. The in-memory record is not touched.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::Storage` if the write fails.
    pub async fn persist(
        &self,
        completion: &ExerciseCompletion,
        repo: &dyn CompletionRepository,
    ) -> Result<bool, ProgressError> {
        let record = CompletionRecord::new(completion.exercise_id.clone(), completion.completed_at);
        Ok(repo.record_completion(&record).await?)
    }
}
