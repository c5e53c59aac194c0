use chrono::{DateTime, Utc};
use speech_core::model::ExerciseId;
use sqlx::Row;

use super::SqliteRepository;
use crate::repository::{CompletionRecord, CompletionRepository, StorageError};

fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

fn map_completion_row(row: &sqlx::sqlite::SqliteRow) -> Result<CompletionRecord, StorageError> {
    // Stored ids are taken verbatim; unknown ones are ignored by the catalog.
    let exercise_id: String = row.try_get("exercise_id").map_err(ser)?;
    let completed_at: DateTime<Utc> = row.try_get("completed_at").map_err(ser)?;
    Ok(CompletionRecord::new(ExerciseId::new(exercise_id), completed_at))
}

#[async_trait::async_trait]
impl CompletionRepository for SqliteRepository {
    async fn record_completion(&self, record: &CompletionRecord) -> Result<bool, StorageError> {
        let res = sqlx::query(
            r"
                INSERT OR IGNORE INTO exercise_completions (exercise_id, completed_at)
                VALUES (?1, ?2)
            ",
        )
        .bind(record.exercise_id.as_str())
        .bind(record.completed_at)
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(res.rows_affected() == 1)
    }

    async fn list_completions(&self) -> Result<Vec<CompletionRecord>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT exercise_id, completed_at
                FROM exercise_completions
                ORDER BY completed_at ASC, exercise_id ASC
            ",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        rows.iter().map(map_completion_row).collect()
    }

    async fn get_completion(&self, id: &ExerciseId) -> Result<CompletionRecord, StorageError> {
        let row = sqlx::query(
            r"
                SELECT exercise_id, completed_at
                FROM exercise_completions
                WHERE exercise_id = ?1
            ",
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?
        .ok_or(StorageError::NotFound)?;

        map_completion_row(&row)
    }
}
