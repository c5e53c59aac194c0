use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use thiserror::Error;

use crate::model::ids::{CategoryId, ExerciseId, is_valid_slug};
use crate::model::payload::{PayloadError, StepPayload};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ExerciseError {
    #[error("exercise id cannot be empty")]
    EmptyId,

    #[error("exercise id must not contain whitespace: {0:?}")]
    InvalidId(String),

    #[error("exercise title cannot be empty")]
    EmptyTitle,

    #[error("exercise category cannot be empty")]
    EmptyCategory,

    #[error("exercise category must not contain whitespace: {0:?}")]
    InvalidCategory(String),

    #[error("exercise level must be >= 1")]
    InvalidLevel,

    #[error(transparent)]
    Payload(#[from] PayloadError),
}

//
// ─── DIFFICULTY ────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Difficulty::Easy => "Easy",
            Difficulty::Medium => "Medium",
            Difficulty::Hard => "Hard",
        };
        f.write_str(label)
    }
}

//
// ─── EXERCISE ──────────────────────────────────────────────────────────────────
//

/// Serialized shape of an exercise as it appears in catalog data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExerciseDraft {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub difficulty: Difficulty,
    #[serde(default = "default_level")]
    pub level: u32,
    pub category_id: String,
    #[serde(default)]
    pub points: u32,
    pub payload: StepPayload,
}

fn default_level() -> u32 {
    1
}

impl ExerciseDraft {
    /// Validate the draft, including the step payload invariants.
    ///
    /// # Errors
    ///
    /// Returns `ExerciseError` if a required field is blank, an id contains
    /// whitespace, the level is zero, or the payload has no steps / a blank
    /// target utterance.
    pub fn validate(self) -> Result<Exercise, ExerciseError> {
        let id = self.id.trim();
        if id.is_empty() {
            return Err(ExerciseError::EmptyId);
        }
        if !is_valid_slug(id) {
            return Err(ExerciseError::InvalidId(id.to_owned()));
        }
        let title = self.title.trim();
        if title.is_empty() {
            return Err(ExerciseError::EmptyTitle);
        }
        let category_id = self.category_id.trim();
        if category_id.is_empty() {
            return Err(ExerciseError::EmptyCategory);
        }
        if !is_valid_slug(category_id) {
            return Err(ExerciseError::InvalidCategory(category_id.to_owned()));
        }
        if self.level == 0 {
            return Err(ExerciseError::InvalidLevel);
        }
        self.payload.validate()?;

        Ok(Exercise {
            id: ExerciseId::new(id),
            title: title.to_owned(),
            description: self.description.trim().to_owned(),
            difficulty: self.difficulty,
            level: self.level,
            category_id: CategoryId::new(category_id),
            points: self.points,
            payload: self.payload,
        })
    }
}

/// A validated, immutable exercise definition.
///
/// Construction goes through `ExerciseDraft::validate`, so `step_count() >= 1`
/// and `target_utterance(i)` is defined for every `i < step_count()`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Exercise {
    id: ExerciseId,
    title: String,
    description: String,
    difficulty: Difficulty,
    level: u32,
    category_id: CategoryId,
    points: u32,
    payload: StepPayload,
}

impl Exercise {
    #[must_use]
    pub fn id(&self) -> &ExerciseId {
        &self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    #[must_use]
    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    #[must_use]
    pub fn level(&self) -> u32 {
        self.level
    }

    #[must_use]
    pub fn category_id(&self) -> &CategoryId {
        &self.category_id
    }

    #[must_use]
    pub fn points(&self) -> u32 {
        self.points
    }

    #[must_use]
    pub fn payload(&self) -> &StepPayload {
        &self.payload
    }

    #[must_use]
    pub fn step_count(&self) -> usize {
        self.payload.step_count()
    }

    #[must_use]
    pub fn target_utterance(&self, step: usize) -> Option<Cow<'_, str>> {
        self.payload.target_utterance(step)
    }

    #[must_use]
    pub fn hint(&self, step: usize) -> Option<Cow<'_, str>> {
        self.payload.hint(step)
    }

    /// Case-insensitive substring match on title or description.
    ///
    /// `needle` must already be lowercased.
    #[must_use]
    pub fn matches_query(&self, needle: &str) -> bool {
        self.title.to_lowercase().contains(needle)
            || self.description.to_lowercase().contains(needle)
    }
}
