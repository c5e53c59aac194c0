mod category;
mod exercise;
mod ids;
mod payload;
mod progress;
mod session;

pub use ids::{CategoryId, ExerciseId, ParseIdError, SessionId};

pub use category::{Category, CategoryDraft, CategoryError};
pub use exercise::{Difficulty, Exercise, ExerciseDraft, ExerciseError};
pub use payload::{
    CategoryPrompt, PairItem, PayloadError, StepPayload, StoryItem, TimedStep, WordItem,
};
pub use progress::{ProgressRecord, percent};
pub use session::{COMPLETION_ATTEMPT_LIMIT, Session};
