use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use services::capture::CaptureCapabilities;
use services::{
    CaptureAdapter, CaptureError, CaptureHandle, CaptureSink, ListenOptions, SpeechOptions,
};

#[derive(Default)]
struct ConsoleState {
    active: Option<CaptureSink>,
    /// Line typed while nothing was listening; consumed by the next listen.
    pending: Option<String>,
}

/// Terminal stand-in for speech I/O: prompts are printed and typed lines
/// are the recognizer's final transcripts.
#[derive(Clone, Default)]
pub struct ConsoleCapture {
    state: Arc<Mutex<ConsoleState>>,
}

impl ConsoleCapture {
    fn lock(&self) -> MutexGuard<'_, ConsoleState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Hands `line` to the running capture. Returns `false` when nothing is
    /// listening; the line is then kept for the next listen.
    pub fn deliver(&self, line: String) -> bool {
        let mut state = self.lock();
        match state.active.take() {
            Some(sink) => {
                sink.final_transcript(line);
                true
            }
            None => {
                state.pending = Some(line);
                false
            }
        }
    }
}

struct ConsoleHandle {
    state: Arc<Mutex<ConsoleState>>,
    capture_id: u64,
}

impl CaptureHandle for ConsoleHandle {
    fn stop(&mut self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if state
            .active
            .as_ref()
            .is_some_and(|sink| sink.capture_id() == self.capture_id)
        {
            state.active = None;
        }
    }
}

impl CaptureAdapter for ConsoleCapture {
    fn capabilities(&self) -> CaptureCapabilities {
        CaptureCapabilities::full()
    }

    fn speak(&self, text: &str, options: &SpeechOptions) -> Result<(), CaptureError> {
        println!("  [{} x{:.1}] {text}", options.language, options.rate);
        Ok(())
    }

    fn listen(
        &self,
        _options: &ListenOptions,
        sink: CaptureSink,
    ) -> Result<Box<dyn CaptureHandle>, CaptureError> {
        let capture_id = sink.capture_id();
        let mut state = self.lock();
        match state.pending.take() {
            Some(line) => {
                sink.final_transcript(line);
            }
            None => {
                println!("  listening... type what you said (:stop to cancel)");
                state.active = Some(sink);
            }
        }
        Ok(Box::new(ConsoleHandle {
            state: Arc::clone(&self.state),
            capture_id,
        }))
    }
}
