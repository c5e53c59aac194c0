//! Boundary to the host's speech synthesis and recognition.
//!
//! The engine never talks to audio devices itself. A `CaptureAdapter` speaks
//! prompts and starts recognitions; recognition results flow back as
//! `CaptureEnvelope`s on an unbounded channel owned by the session loop, tagged
//! with the id of the capture that produced them so results from a stopped
//! capture can be told apart from the current one.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;

//
// ─── OPTIONS ───────────────────────────────────────────────────────────────────
//

/// Voice parameters for prompt playback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechOptions {
    /// Playback rate; slightly slower than normal for clarity.
    pub rate: f32,
    pub pitch: f32,
    pub volume: f32,
    pub language: String,
}

impl Default for SpeechOptions {
    fn default() -> Self {
        Self {
            rate: 0.9,
            pitch: 1.0,
            volume: 1.0,
            language: "en-US".into(),
        }
    }
}

/// Recognition parameters for a single listen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListenOptions {
    pub language: String,
    pub interim_results: bool,
    /// Always `false`: one utterance per capture.
    pub continuous: bool,
}

/// What the host can do right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureCapabilities {
    pub can_speak: bool,
    pub can_listen: bool,
}

impl CaptureCapabilities {
    #[must_use]
    pub fn full() -> Self {
        Self {
            can_speak: true,
            can_listen: true,
        }
    }

    #[must_use]
    pub fn none() -> Self {
        Self {
            can_speak: false,
            can_listen: false,
        }
    }
}

//
// ─── EVENTS ────────────────────────────────────────────────────────────────────
//

/// Output of a running capture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureEvent {
    /// Partial hypothesis; display only.
    Interim(String),
    /// Final transcript; the only event that gets scored.
    Final(String),
    /// The recognizer gave up mid-listen.
    Failed(String),
}

/// A `CaptureEvent` tagged with the capture that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureEnvelope {
    pub capture_id: u64,
    pub event: CaptureEvent,
}

pub type CaptureSender = mpsc::UnboundedSender<CaptureEnvelope>;
pub type CaptureReceiver = mpsc::UnboundedReceiver<CaptureEnvelope>;

/// Channel carrying capture events from adapters to the session loop.
#[must_use]
pub fn capture_channel() -> (CaptureSender, CaptureReceiver) {
    mpsc::unbounded_channel()
}

/// Handed to an adapter for exactly one capture.
#[derive(Debug, Clone)]
pub struct CaptureSink {
    capture_id: u64,
    tx: CaptureSender,
}

impl CaptureSink {
    pub(crate) fn new(capture_id: u64, tx: CaptureSender) -> Self {
        Self { capture_id, tx }
    }

    #[must_use]
    pub fn capture_id(&self) -> u64 {
        self.capture_id
    }

    /// Returns `false` once the session loop is gone.
    pub fn send(&self, event: CaptureEvent) -> bool {
        self.tx
            .send(CaptureEnvelope {
                capture_id: self.capture_id,
                event,
            })
            .is_ok()
    }

    pub fn interim(&self, text: impl Into<String>) -> bool {
        self.send(CaptureEvent::Interim(text.into()))
    }

    pub fn final_transcript(&self, text: impl Into<String>) -> bool {
        self.send(CaptureEvent::Final(text.into()))
    }

    pub fn failed(&self, reason: impl Into<String>) -> bool {
        self.send(CaptureEvent::Failed(reason.into()))
    }
}

//
// ─── CONTRACT ──────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CaptureError {
    #[error("speech capability is not available on this host")]
    Unavailable,
    #[error("speech capture failed: {0}")]
    Failed(String),
}

/// Cancellation handle for a running capture.
pub trait CaptureHandle: Send {
    /// Stops the capture. Calling it more than once is harmless.
    fn stop(&mut self);
}

/// Host speech services consumed by the session engine.
pub trait CaptureAdapter: Send + Sync {
    fn capabilities(&self) -> CaptureCapabilities;

    /// Plays `text`. Best effort: returning does not mean playback finished.
    ///
    /// # Errors
    ///
    /// `CaptureError::Unavailable` when the host cannot synthesize speech.
    fn speak(&self, text: &str, options: &SpeechOptions) -> Result<(), CaptureError>;

    /// Starts a recognition that reports through `sink`.
    ///
    /// # Errors
    ///
    /// `CaptureError::Unavailable` when the host cannot recognize speech,
    /// `CaptureError::Failed` when the recognizer refuses to start.
    fn listen(
        &self,
        options: &ListenOptions,
        sink: CaptureSink,
    ) -> Result<Box<dyn CaptureHandle>, CaptureError>;
}

//
// ─── NULL ADAPTER ──────────────────────────────────────────────────────────────
//

/// Adapter for hosts without any speech support.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullCapture;

impl CaptureAdapter for NullCapture {
    fn capabilities(&self) -> CaptureCapabilities {
        CaptureCapabilities::none()
    }

    fn speak(&self, _text: &str, _options: &SpeechOptions) -> Result<(), CaptureError> {
        Err(CaptureError::Unavailable)
    }

    fn listen(
        &self,
        _options: &ListenOptions,
        _sink: CaptureSink,
    ) -> Result<Box<dyn CaptureHandle>, CaptureError> {
        Err(CaptureError::Unavailable)
    }
}

//
// ─── SCRIPTED ADAPTER ──────────────────────────────────────────────────────────
//

#[derive(Debug)]
struct ScriptState {
    capabilities: CaptureCapabilities,
    scripts: VecDeque<Vec<CaptureEvent>>,
    spoken: Vec<String>,
    listens: Vec<ListenOptions>,
    stops: usize,
}

/// Replays queued capture events; one queued script per `listen` call.
///
/// A `listen` with nothing queued starts a capture that never reports,
/// which is how tests exercise cancellation and timeouts.
#[derive(Debug, Clone)]
pub struct ScriptedCapture {
    state: Arc<Mutex<ScriptState>>,
}

impl Default for ScriptedCapture {
    fn default() -> Self {
        Self::with_capabilities(CaptureCapabilities::full())
    }
}

impl ScriptedCapture {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_capabilities(capabilities: CaptureCapabilities) -> Self {
        Self {
            state: Arc::new(Mutex::new(ScriptState {
                capabilities,
                scripts: VecDeque::new(),
                spoken: Vec::new(),
                listens: Vec::new(),
                stops: 0,
            })),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ScriptState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queues the events the next `listen` will emit.
    pub fn push_listen(&self, events: Vec<CaptureEvent>) {
        self.lock().scripts.push_back(events);
    }

    /// Queues a listen that ends with the final transcript `text`.
    pub fn push_final(&self, text: impl Into<String>) {
        self.push_listen(vec![CaptureEvent::Final(text.into())]);
    }

    #[must_use]
    pub fn spoken(&self) -> Vec<String> {
        self.lock().spoken.clone()
    }

    #[must_use]
    pub fn listen_count(&self) -> usize {
        self.lock().listens.len()
    }

    #[must_use]
    pub fn last_listen_options(&self) -> Option<ListenOptions> {
        self.lock().listens.last().cloned()
    }

    #[must_use]
    pub fn stop_count(&self) -> usize {
        self.lock().stops
    }
}

struct ScriptedHandle {
    state: Arc<Mutex<ScriptState>>,
    stopped: bool,
}

impl CaptureHandle for ScriptedHandle {
    fn stop(&mut self) {
        if self.stopped {
            return;
        }
        self.stopped = true;
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .stops += 1;
    }
}

impl CaptureAdapter for ScriptedCapture {
    fn capabilities(&self) -> CaptureCapabilities {
        self.lock().capabilities
    }

    fn speak(&self, text: &str, _options: &SpeechOptions) -> Result<(), CaptureError> {
        let mut state = self.lock();
        if !state.capabilities.can_speak {
            return Err(CaptureError::Unavailable);
        }
        state.spoken.push(text.to_owned());
        Ok(())
    }

    fn listen(
        &self,
        options: &ListenOptions,
        sink: CaptureSink,
    ) -> Result<Box<dyn CaptureHandle>, CaptureError> {
        let script = {
            let mut state = self.lock();
            if !state.capabilities.can_listen {
                return Err(CaptureError::Unavailable);
            }
            state.listens.push(options.clone());
            state.scripts.pop_front().unwrap_or_default()
        };
        for event in script {
            sink.send(event);
        }
        Ok(Box::new(ScriptedHandle {
            state: Arc::clone(&self.state),
            stopped: false,
        }))
    }
}
