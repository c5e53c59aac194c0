//! Static exercise catalog and its read-only filtering.

mod builtin;

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{
    Category, CategoryDraft, CategoryError, CategoryId, Exercise, ExerciseDraft, ExerciseError,
    ExerciseId,
};

pub use builtin::builtin_drafts;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

/// Fatal catalog construction failure.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CatalogError {
    #[error("catalog has no valid categories")]
    NoCategories,
}

/// Why a single catalog entry was left out.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum EntryError {
    #[error(transparent)]
    Category(#[from] CategoryError),
    #[error(transparent)]
    Exercise(#[from] ExerciseError),
    #[error("duplicate id")]
    Duplicate,
    #[error("unknown category: {0}")]
    UnknownCategory(CategoryId),
}

/// A category or exercise that failed validation and was excluded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedEntry {
    pub id: String,
    pub error: EntryError,
}

/// What happened while building a catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogLoadReport {
    pub categories: usize,
    pub exercises: usize,
    pub rejected: Vec<RejectedEntry>,
}

impl CatalogLoadReport {
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.rejected.is_empty()
    }
}

//
// ─── DRAFTS ────────────────────────────────────────────────────────────────────
//

/// Serialized catalog: categories plus exercises.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogDraft {
    #[serde(default)]
    pub categories: Vec<CategoryDraft>,
    #[serde(default)]
    pub exercises: Vec<ExerciseDraft>,
}

impl CatalogDraft {
    /// Validate every entry, dropping the ones that fail.
    ///
    /// Exercises are excluded when their payload is empty or has a blank target,
    /// when their id is not a slug or repeats, or when their category is not in
    /// the catalog.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::NoCategories` if no category survives validation.
    pub fn build(self) -> Result<(Catalog, CatalogLoadReport), CatalogError> {
        let mut report = CatalogLoadReport::default();
        let mut categories: Vec<Category> = Vec::with_capacity(self.categories.len());

        for draft in self.categories {
            let raw_id = draft.id.clone();
            match draft.validate() {
                Ok(category) if categories.iter().any(|c| c.id() == category.id()) => {
                    report.rejected.push(RejectedEntry {
                        id: raw_id,
                        error: EntryError::Duplicate,
                    });
                }
                Ok(category) => categories.push(category),
                Err(err) => report.rejected.push(RejectedEntry {
                    id: raw_id,
                    error: err.into(),
                }),
            }
        }

        if categories.is_empty() {
            return Err(CatalogError::NoCategories);
        }

        let known: HashSet<&CategoryId> = categories.iter().map(Category::id).collect();
        let mut seen: HashSet<ExerciseId> = HashSet::new();
        let mut exercises = Vec::with_capacity(self.exercises.len());

        for draft in self.exercises {
            let raw_id = draft.id.clone();
            let exercise = match draft.validate() {
                Ok(exercise) => exercise,
                Err(err) => {
                    report.rejected.push(RejectedEntry {
                        id: raw_id,
                        error: err.into(),
                    });
                    continue;
                }
            };
            if !known.contains(exercise.category_id()) {
                report.rejected.push(RejectedEntry {
                    id: raw_id,
                    error: EntryError::UnknownCategory(exercise.category_id().clone()),
                });
                continue;
            }
            if !seen.insert(exercise.id().clone()) {
                report.rejected.push(RejectedEntry {
                    id: raw_id,
                    error: EntryError::Duplicate,
                });
                continue;
            }
            exercises.push(exercise);
        }

        report.categories = categories.len();
        report.exercises = exercises.len();
        Ok((
            Catalog {
                categories,
                exercises,
            },
            report,
        ))
    }
}

//
// ─── FILTER ────────────────────────────────────────────────────────────────────
//

/// Category + text filter over the catalog. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExerciseFilter {
    pub category_id: Option<CategoryId>,
    pub query: Option<String>,
}

impl ExerciseFilter {
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_category(mut self, id: CategoryId) -> Self {
        self.category_id = Some(id);
        self
    }

    #[must_use]
    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    fn needle(&self) -> Option<String> {
        self.query
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .map(str::to_lowercase)
    }
}

//
// ─── CATALOG ───────────────────────────────────────────────────────────────────
//

/// Immutable set of categories and validated exercises.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Catalog {
    categories: Vec<Category>,
    exercises: Vec<Exercise>,
}

impl Catalog {
    /// The catalog shipped with the application.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError` if the built-in data is malformed.
    pub fn builtin() -> Result<(Self, CatalogLoadReport), CatalogError> {
        builtin_drafts().build()
    }

    #[must_use]
    pub fn list_categories(&self) -> &[Category] {
        &self.categories
    }

    #[must_use]
    pub fn category(&self, id: &CategoryId) -> Option<&Category> {
        self.categories.iter().find(|c| c.id() == id)
    }

    /// Exercises matching `filter`, in catalog order.
    #[must_use]
    pub fn list_exercises(&self, filter: &ExerciseFilter) -> Vec<&Exercise> {
        let needle = filter.needle();
        self.exercises
            .iter()
            .filter(|e| {
                filter
                    .category_id
                    .as_ref()
                    .is_none_or(|id| e.category_id() == id)
            })
            .filter(|e| needle.as_deref().is_none_or(|n| e.matches_query(n)))
            .collect()
    }

    #[must_use]
    pub fn get_exercise(&self, id: &ExerciseId) -> Option<&Exercise> {
        self.exercises.iter().find(|e| e.id() == id)
    }

    pub fn exercises_in_category<'a>(
        &'a self,
        id: &'a CategoryId,
    ) -> impl Iterator<Item = &'a Exercise> + 'a {
        self.exercises.iter().filter(move |e| e.category_id() == id)
    }

    #[must_use]
    pub fn exercise_count(&self) -> usize {
        self.exercises.len()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Difficulty, PayloadError, StepPayload};

    fn category(id: &str) -> CategoryDraft {
        CategoryDraft {
            id: id.into(),
            name: id.to_uppercase(),
            description: String::new(),
            icon: String::new(),
        }
    }

    fn exercise(id: &str, category_id: &str, items: &[&str]) -> ExerciseDraft {
        ExerciseDraft {
            id: id.into(),
            title: format!("Exercise {id}"),
            description: String::new(),
            difficulty: Difficulty::Easy,
            level: 1,
            category_id: category_id.into(),
            points: 10,
            payload: StepPayload::PhraseList {
                items: items.iter().map(|s| (*s).to_owned()).collect(),
            },
        }
    }

    #[test]
    fn malformed_exercises_are_excluded_not_fatal() {
        let draft = CatalogDraft {
            categories: vec![category("fluency")],
            exercises: vec![
                exercise("ok", "fluency", &["hello"]),
                exercise("empty", "fluency", &[]),
                exercise("orphan", "nowhere", &["hi"]),
                exercise("ok", "fluency", &["again"]),
            ],
        };

        let (catalog, report) = draft.build().unwrap();
        assert_eq!(catalog.exercise_count(), 1);
        assert_eq!(report.rejected.len(), 3);
        assert_eq!(
            report.rejected[0].error,
            EntryError::Exercise(ExerciseError::Payload(PayloadError::NoSteps))
        );
        assert_eq!(
            report.rejected[1].error,
            EntryError::UnknownCategory(CategoryId::new("nowhere"))
        );
        assert_eq!(report.rejected[2].error, EntryError::Duplicate);
    }

    #[test]
    fn spaced_ids_are_reported_at_load() {
        let draft = CatalogDraft {
            categories: vec![category("fluency"), category("sound drills")],
            exercises: vec![
                exercise("word repetition", "fluency", &["hello"]),
                exercise("word-repetition", "fluency", &["hello"]),
            ],
        };

        let (catalog, report) = draft.build().unwrap();
        assert_eq!(catalog.list_categories().len(), 1);
        assert_eq!(catalog.exercise_count(), 1);
        assert_eq!(
            report.rejected,
            vec![
                RejectedEntry {
                    id: "sound drills".into(),
                    error: EntryError::Category(CategoryError::InvalidId("sound drills".into())),
                },
                RejectedEntry {
                    id: "word repetition".into(),
                    error: EntryError::Exercise(ExerciseError::InvalidId(
                        "word repetition".into()
                    )),
                },
            ]
        );
    }

    #[test]
    fn catalog_without_categories_fails() {
        let draft = CatalogDraft {
            categories: vec![],
            exercises: vec![exercise("a", "x", &["hi"])],
        };
        assert_eq!(draft.build().unwrap_err(), CatalogError::NoCategories);
    }

    #[test]
    fn filter_composes_category_and_query() {
        let (catalog, report) = Catalog::builtin().unwrap();
        assert!(report.is_clean());

        let filter = ExerciseFilter::all()
            .with_category(CategoryId::new("articulation"))
            .with_query("VOWEL");
        let found = catalog.list_exercises(&filter);

        assert!(!found.is_empty());
        for exercise in &found {
            assert_eq!(exercise.category_id().as_str(), "articulation");
            assert!(exercise.matches_query("vowel"));
        }

        let expected = catalog
            .exercises_in_category(&CategoryId::new("articulation"))
            .filter(|e| e.matches_query("vowel"))
            .count();
        assert_eq!(found.len(), expected);

        // The same query outside the category finds more.
        let everywhere = catalog.list_exercises(&ExerciseFilter::all().with_query("vowel"));
        assert!(everywhere.len() > found.len());
    }

    #[test]
    fn empty_filter_lists_everything() {
        let (catalog, _) = Catalog::builtin().unwrap();
        assert_eq!(
            catalog.list_exercises(&ExerciseFilter::all()).len(),
            catalog.exercise_count()
        );
        let blank = ExerciseFilter::all().with_query("   ");
        assert_eq!(catalog.list_exercises(&blank).len(), catalog.exercise_count());
    }

    #[test]
    fn builtin_has_consonant_practice_with_five_words() {
        let (catalog, _) = Catalog::builtin().unwrap();
        let exercise = catalog
            .get_exercise(&ExerciseId::new("consonant-practice"))
            .unwrap();
        assert_eq!(exercise.title(), "Consonant Practice");
        assert_eq!(exercise.step_count(), 5);
        assert_eq!(exercise.target_utterance(0).as_deref(), Some("Park"));
    }

    #[test]
    fn builtin_covers_every_category() {
        let (catalog, _) = Catalog::builtin().unwrap();
        for category in catalog.list_categories() {
            assert!(
                catalog.exercises_in_category(category.id()).next().is_some(),
                "category {} has no exercises",
                category.id()
            );
        }
    }
}
