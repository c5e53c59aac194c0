use std::fmt;

use serde::Serialize;

/// Resting states of the session machine.
///
/// Completion is not a resting state: the `advance` that completes an
/// exercise reports it and leaves the machine `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    Idle,
    StepActive,
    Listening,
    Evaluated,
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SessionPhase::Idle => "idle",
            SessionPhase::StepActive => "step active",
            SessionPhase::Listening => "listening",
            SessionPhase::Evaluated => "evaluated",
        };
        f.write_str(label)
    }
}

/// Operations that can be refused by the session machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionAction {
    RequestPrompt,
    BeginListening,
    TranscriptFinal,
    StopListening,
    Advance,
    Retreat,
}

impl fmt::Display for SessionAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SessionAction::RequestPrompt => "play the prompt",
            SessionAction::BeginListening => "start listening",
            SessionAction::TranscriptFinal => "score a transcript",
            SessionAction::StopListening => "stop listening",
            SessionAction::Advance => "advance",
            SessionAction::Retreat => "go back",
        };
        f.write_str(label)
    }
}

impl SessionPhase {
    /// Whether `action` is accepted in this phase.
    #[must_use]
    pub fn allows(self, action: SessionAction) -> bool {
        use SessionAction as A;
        use SessionPhase as P;
        match (self, action) {
            (P::Idle, _) => false,
            (P::Listening, A::TranscriptFinal | A::StopListening | A::BeginListening) => true,
            (P::Listening, _) => false,
            (P::StepActive | P::Evaluated, A::TranscriptFinal | A::StopListening) => false,
            (P::StepActive | P::Evaluated, _) => true,
        }
    }
}
