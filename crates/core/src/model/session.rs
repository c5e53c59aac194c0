use crate::model::exercise::Exercise;
use crate::model::ids::{ExerciseId, SessionId};
use crate::scoring::{Feedback, Score, Tier};

/// Attempts after which the final step may be finished without a success.
pub const COMPLETION_ATTEMPT_LIMIT: u32 = 3;

/// Per-exercise practice record while an exercise is open.
///
/// Holds only data; phase handling (listening, evaluated, ...) lives in the
/// services layer. Every step change resets the attempt-level fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    id: SessionId,
    exercise_id: ExerciseId,
    step_count: usize,
    current_step: usize,
    attempts: u32,
    last_transcript: Option<String>,
    feedback: Option<Feedback>,
    hint_visible: bool,
    is_correct: bool,
}

impl Session {
    /// Opens a fresh session at step 0.
    #[must_use]
    pub fn start(exercise: &Exercise) -> Self {
        Self {
            id: SessionId::generate(),
            exercise_id: exercise.id().clone(),
            step_count: exercise.step_count(),
            current_step: 0,
            attempts: 0,
            last_transcript: None,
            feedback: None,
            hint_visible: false,
            is_correct: false,
        }
    }

    #[must_use]
    pub fn id(&self) -> SessionId {
        self.id
    }

    #[must_use]
    pub fn exercise_id(&self) -> &ExerciseId {
        &self.exercise_id
    }

    #[must_use]
    pub fn step_count(&self) -> usize {
        self.step_count
    }

    #[must_use]
    pub fn current_step(&self) -> usize {
        self.current_step
    }

    #[must_use]
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    #[must_use]
    pub fn last_transcript(&self) -> Option<&str> {
        self.last_transcript.as_deref()
    }

    #[must_use]
    pub fn feedback(&self) -> Option<&Feedback> {
        self.feedback.as_ref()
    }

    #[must_use]
    pub fn hint_visible(&self) -> bool {
        self.hint_visible
    }

    #[must_use]
    pub fn is_correct(&self) -> bool {
        self.is_correct
    }

    #[must_use]
    pub fn is_first_step(&self) -> bool {
        self.current_step == 0
    }

    #[must_use]
    pub fn is_last_step(&self) -> bool {
        self.current_step + 1 >= self.step_count
    }

    /// Whether the last step may be left: passed, or attempts exhausted.
    #[must_use]
    pub fn can_finish(&self) -> bool {
        self.is_correct || self.attempts >= COMPLETION_ATTEMPT_LIMIT
    }

    /// Drops the previous transcript and feedback before a new capture.
    ///
    /// `is_correct` survives: a pass on this step keeps the last-step gate open
    /// until the next scored attempt replaces it.
    pub fn clear_attempt_result(&mut self) {
        self.last_transcript = None;
        self.feedback = None;
    }

    /// Stores a scored attempt and returns the feedback it produced.
    pub fn record_scored_attempt(&mut self, transcript: String, score: &Score) -> &Feedback {
        self.attempts = self.attempts.saturating_add(1);
        self.last_transcript = Some(transcript);
        self.is_correct = score.tier == Tier::Success;
        self.feedback.insert(score.feedback())
    }

    /// Counts an attempt that produced no transcript (cancelled, failed, timed out).
    pub fn record_unscored_attempt(&mut self) {
        self.attempts = self.attempts.saturating_add(1);
        self.feedback = None;
    }

    pub fn toggle_hint(&mut self) -> bool {
        self.hint_visible = !self.hint_visible;
        self.hint_visible
    }

    /// Moves to `step` and resets attempt state. Out-of-range steps are ignored.
    pub fn move_to_step(&mut self, step: usize) -> bool {
        if step >= self.step_count || step == self.current_step {
            return false;
        }
        self.current_step = step;
        self.attempts = 0;
        self.last_transcript = None;
        self.feedback = None;
        self.hint_visible = false;
        self.is_correct = false;
        true
    }
}
