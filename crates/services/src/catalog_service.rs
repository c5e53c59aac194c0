use std::sync::Arc;

use speech_core::catalog::{Catalog, CatalogDraft, CatalogLoadReport, ExerciseFilter};
use speech_core::model::{Category, CategoryId, Exercise, ExerciseId};

use crate::error::CatalogServiceError;

/// Read-only access to the exercise catalog.
#[derive(Debug, Clone)]
pub struct CatalogService {
    catalog: Arc<Catalog>,
}

impl CatalogService {
    /// Load the catalog bundled with the application.
    ///
    /// # Errors
    ///
    /// Returns `CatalogServiceError::Catalog` if no category survives validation.
    pub fn builtin() -> Result<Self, CatalogServiceError> {
        Self::from_draft(speech_core::catalog::builtin_drafts())
    }

    /// Load a catalog from its JSON representation.
    ///
    /// Invalid entries are dropped and logged; only unreadable JSON or a
    /// catalog without categories is fatal.
    ///
    /// # Errors
    ///
    /// Returns `CatalogServiceError::Json` for malformed JSON and
    /// `CatalogServiceError::Catalog` if no category survives validation.
    pub fn from_json_str(json: &str) -> Result<Self, CatalogServiceError> {
        let draft: CatalogDraft = serde_json::from_str(json)?;
        Self::from_draft(draft)
    }

    /// Validate catalog data and log what was excluded.
    ///
    /// # Errors
    ///
    /// Returns `CatalogServiceError::Catalog` if no category survives validation.
    pub fn from_draft(draft: CatalogDraft) -> Result<Self, CatalogServiceError> {
        let (catalog, report) = draft.build()?;
        log_report(&report);
        Ok(Self {
            catalog: Arc::new(catalog),
        })
    }

    #[must_use]
    pub fn catalog(&self) -> Arc<Catalog> {
        Arc::clone(&self.catalog)
    }

    #[must_use]
    pub fn list_categories(&self) -> &[Category] {
        self.catalog.list_categories()
    }

    #[must_use]
    pub fn list_exercises(&self, filter: &ExerciseFilter) -> Vec<&Exercise> {
        self.catalog.list_exercises(filter)
    }

    /// Look up an exercise by id.
    ///
    /// # Errors
    ///
    /// Returns `CatalogServiceError::UnknownExercise` if the id is not in the catalog.
    pub fn get_exercise(&self, id: &ExerciseId) -> Result<&Exercise, CatalogServiceError> {
        self.catalog
            .get_exercise(id)
            .ok_or_else(|| CatalogServiceError::UnknownExercise(id.clone()))
    }

    #[must_use]
    pub fn category(&self, id: &CategoryId) -> Option<&Category> {
        self.catalog.category(id)
    }
}

fn log_report(report: &CatalogLoadReport) {
    for rejected in &report.rejected {
        tracing::warn!(id = %rejected.id, error = %rejected.error, "catalog entry excluded");
    }
    tracing::debug!(
        categories = report.categories,
        exercises = report.exercises,
        rejected = report.rejected.len(),
        "catalog loaded"
    );
}
