use std::fmt;

use serde::Serialize;

use speech_core::model::{ExerciseId, SessionId};
use speech_core::scoring::Feedback;

use crate::progress::ExerciseCompletion;

use super::phase::SessionPhase;

/// Dismissible notice about the last capture.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "reason", rename_all = "snake_case")]
pub enum CaptureNotice {
    /// The recognizer reported an error; no feedback was produced.
    Failed(String),
    /// No final transcript arrived before the listen timeout.
    TimedOut,
}

impl fmt::Display for CaptureNotice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptureNotice::Failed(reason) => write!(f, "Speech recognition failed: {reason}"),
            CaptureNotice::TimedOut => f.write_str("No speech was heard. Try again when ready."),
        }
    }
}

/// Persistent advisory about missing speech capabilities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureAdvisory {
    PlaybackUnavailable,
    RecordingUnavailable,
    SpeechUnavailable,
}

impl CaptureAdvisory {
    #[must_use]
    pub fn from_availability(can_play: bool, can_record: bool) -> Option<Self> {
        match (can_play, can_record) {
            (true, true) => None,
            (false, true) => Some(Self::PlaybackUnavailable),
            (true, false) => Some(Self::RecordingUnavailable),
            (false, false) => Some(Self::SpeechUnavailable),
        }
    }
}

impl fmt::Display for CaptureAdvisory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            CaptureAdvisory::PlaybackUnavailable => {
                "Prompt playback is not available on this device."
            }
            CaptureAdvisory::RecordingUnavailable => concat!(
                "Speech recognition is not available on this device. ",
                "You can still move between steps."
            ),
            CaptureAdvisory::SpeechUnavailable => {
                "Speech is not available on this device. You can still move between steps."
            }
        };
        f.write_str(text)
    }
}

/// Everything the UI shell renders for the open step.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepView {
    pub session_id: SessionId,
    pub exercise_id: ExerciseId,
    pub exercise_title: String,
    pub step_index: usize,
    pub step_count: usize,
    pub target: String,
    /// Present when the step has a hint, whether or not it is shown.
    pub hint: Option<String>,
    pub hint_visible: bool,
    pub attempts: u32,
    pub is_correct: bool,
    pub feedback: Option<Feedback>,
    pub last_transcript: Option<String>,
    pub interim_transcript: Option<String>,
    pub notice: Option<CaptureNotice>,
    pub can_go_back: bool,
    pub can_advance: bool,
}

impl StepView {
    /// Hint text when the user asked to see it.
    #[must_use]
    pub fn visible_hint(&self) -> Option<&str> {
        self.hint.as_deref().filter(|_| self.hint_visible)
    }

    #[must_use]
    pub fn is_last_step(&self) -> bool {
        self.step_index + 1 >= self.step_count
    }
}

/// Read-only picture of the session machine after an event.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub phase: SessionPhase,
    pub step: Option<StepView>,
    pub can_play: bool,
    pub can_record: bool,
    pub advisory: Option<CaptureAdvisory>,
    /// Most recent completion, kept after the machine returns to `Idle`.
    pub last_completion: Option<ExerciseCompletion>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advisory_reflects_missing_capabilities() {
        assert_eq!(CaptureAdvisory::from_availability(true, true), None);
        assert_eq!(
            CaptureAdvisory::from_availability(true, false),
            Some(CaptureAdvisory::RecordingUnavailable)
        );
        assert_eq!(
            CaptureAdvisory::from_availability(false, false),
            Some(CaptureAdvisory::SpeechUnavailable)
        );
    }

    #[test]
    fn notice_serializes_with_reason() {
        let json = serde_json::to_string(&CaptureNotice::Failed("no-speech".into())).unwrap();
        assert_eq!(json, r#"{"kind":"failed","reason":"no-speech"}"#);
    }
}
