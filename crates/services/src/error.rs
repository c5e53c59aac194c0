//! Shared error types for the services crate.

use thiserror::Error;

use speech_core::catalog::CatalogError;
use speech_core::model::ExerciseId;
use storage::repository::StorageError;

use crate::sessions::{SessionAction, SessionPhase};

/// Errors emitted by `CatalogService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CatalogServiceError {
    #[error("catalog data is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error("unknown exercise: {0}")]
    UnknownExercise(ExerciseId),
}

/// Errors emitted by `ProgressTracker` when talking to storage.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProgressError {
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by session services.
///
/// Capture problems are not errors: they are recorded on the session as
/// notices and advisories.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    #[error("no exercise is open")]
    NoActiveSession,
    #[error("cannot {action} while {phase}")]
    InvalidTransition {
        action: SessionAction,
        phase: SessionPhase,
    },
    #[error("step {step} has no hint")]
    NoHint { step: usize },
    #[error(transparent)]
    Catalog(#[from] CatalogServiceError),
}

/// Errors emitted while validating `EngineSettings`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SettingsError {
    #[error("listen timeout must be between 1 and 300 seconds, got {0}")]
    InvalidListenTimeout(u64),
    #[error("speech rate must be in (0, 10]")]
    InvalidRate,
    #[error("speech pitch must be in [0, 2]")]
    InvalidPitch,
    #[error("speech volume must be in [0, 1]")]
    InvalidVolume,
    #[error("speech language cannot be empty")]
    EmptyLanguage,
}
