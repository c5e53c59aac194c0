#![forbid(unsafe_code)]

pub mod capture;
pub mod catalog_service;
pub mod error;
pub mod progress;
pub mod sessions;
pub mod settings;

pub use speech_core::Clock;
pub use sessions as session;

pub use capture::{
    CaptureAdapter, CaptureCapabilities, CaptureError, CaptureEvent, CaptureHandle, CaptureSink,
    ListenOptions, NullCapture, ScriptedCapture, SpeechOptions, capture_channel,
};
pub use catalog_service::CatalogService;
pub use error::{CatalogServiceError, ProgressError, SessionError, SettingsError};
pub use progress::{CategoryProgress, ExerciseCompletion, ProgressTracker};
pub use settings::EngineSettings;

pub use sessions::{
    AdvanceOutcome, CaptureNotice, ListenOutcome, LoopSummary, PromptOutcome, SessionCommand,
    SessionEvent, SessionLoopService, SessionPhase, SessionService, SessionSnapshot,
    SessionUpdate, StepView,
};
