mod phase;
mod service;
mod view;
mod workflow;

// Public API of the session subsystem.
pub use crate::error::SessionError;
pub use phase::{SessionAction, SessionPhase};
pub use service::{
    AdvanceOutcome, CaptureDisposition, ListenOutcome, PromptOutcome, SessionService,
};
pub use view::{CaptureAdvisory, CaptureNotice, SessionSnapshot, StepView};
pub use workflow::{LoopSummary, SessionCommand, SessionEvent, SessionLoopService, SessionUpdate};
