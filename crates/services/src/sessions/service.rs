use std::sync::Arc;

use tokio::time::Instant;

use speech_core::Clock;
use speech_core::model::{Exercise, ExerciseId, Session, SessionId};
use speech_core::scoring::{self, Feedback};

use crate::capture::{
    CaptureAdapter, CaptureEnvelope, CaptureError, CaptureEvent, CaptureHandle, CaptureSender,
    CaptureSink,
};
use crate::error::{CatalogServiceError, SessionError};
use crate::progress::{ExerciseCompletion, ProgressTracker};
use crate::settings::EngineSettings;

use super::phase::{SessionAction, SessionPhase};
use super::view::{CaptureAdvisory, CaptureNotice, SessionSnapshot, StepView};

/// Result of `request_prompt`. Playback problems never fail the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptOutcome {
    Spoken,
    Unavailable,
    Failed(String),
}

/// Result of `begin_listening`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListenOutcome {
    /// A capture is running; `restarted` when it replaced a running one.
    Started { capture_id: u64, restarted: bool },
    Unavailable,
    /// The recognizer refused to start. No attempt is counted.
    Failed(String),
}

/// What `handle_capture` did with an event.
#[derive(Debug, Clone, PartialEq)]
pub enum CaptureDisposition {
    /// From a capture that is no longer current, or arrived outside `Listening`.
    Stale,
    Interim,
    Scored(Feedback),
    Failed,
}

/// Result of `advance`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdvanceOutcome {
    Moved { step: usize },
    /// Last step, neither passed nor out of attempts.
    Blocked { attempts: u32 },
    Completed(ExerciseCompletion),
}

struct RunningCapture {
    id: u64,
    handle: Box<dyn CaptureHandle>,
    deadline: Instant,
}

impl RunningCapture {
    fn stop(mut self) {
        self.handle.stop();
    }
}

struct OpenExercise {
    exercise: Exercise,
    session: Session,
    phase: SessionPhase,
    capture: Option<RunningCapture>,
    interim: Option<String>,
    notice: Option<CaptureNotice>,
}

impl OpenExercise {
    fn target(&self) -> String {
        self.exercise
            .target_utterance(self.session.current_step())
            .map(|t| t.into_owned())
            .unwrap_or_default()
    }

    fn hint(&self) -> Option<String> {
        self.exercise
            .hint(self.session.current_step())
            .map(|h| h.into_owned())
    }

    fn release_capture(&mut self) {
        if let Some(capture) = self.capture.take() {
            capture.stop();
        }
        self.interim = None;
    }

    fn score_transcript(&mut self, transcript: String) -> Feedback {
        self.release_capture();
        let score = scoring::score(&self.target(), &transcript);
        let feedback = self.session.record_scored_attempt(transcript, &score).clone();
        self.phase = SessionPhase::Evaluated;
        feedback
    }

    /// Ends the listen without a transcript; the attempt still counts.
    fn abandon_listen(&mut self, notice: Option<CaptureNotice>) {
        self.release_capture();
        self.session.record_unscored_attempt();
        self.notice = notice;
        self.phase = SessionPhase::StepActive;
    }

    fn move_to(&mut self, step: usize) -> bool {
        if !self.session.move_to_step(step) {
            return false;
        }
        self.phase = SessionPhase::StepActive;
        self.interim = None;
        self.notice = None;
        true
    }
}

fn require(
    open: &mut Option<OpenExercise>,
    action: SessionAction,
) -> Result<&mut OpenExercise, SessionError> {
    let open = open.as_mut().ok_or(SessionError::NoActiveSession)?;
    if !open.phase.allows(action) {
        return Err(SessionError::InvalidTransition {
            action,
            phase: open.phase,
        });
    }
    Ok(open)
}

/// The session state machine for one practice surface.
///
/// At most one exercise is open at a time. Every operation is a synchronous
/// reaction to a single event; capture results reach the machine through
/// `handle_capture`, which drops events from superseded captures.
pub struct SessionService {
    capture: Arc<dyn CaptureAdapter>,
    capture_tx: CaptureSender,
    progress: ProgressTracker,
    settings: EngineSettings,
    clock: Clock,
    open: Option<OpenExercise>,
    next_capture_id: u64,
    can_play: bool,
    can_record: bool,
    last_completion: Option<ExerciseCompletion>,
}

impl SessionService {
    /// Idle machine. Capture events are sent on `capture_tx`.
    #[must_use]
    pub fn new(
        capture: Arc<dyn CaptureAdapter>,
        capture_tx: CaptureSender,
        progress: ProgressTracker,
    ) -> Self {
        let capabilities = capture.capabilities();
        Self {
            capture,
            capture_tx,
            progress,
            settings: EngineSettings::default(),
            clock: Clock::default(),
            open: None,
            next_capture_id: 0,
            can_play: capabilities.can_speak,
            can_record: capabilities.can_listen,
            last_completion: None,
        }
    }

    #[must_use]
    pub fn with_settings(mut self, settings: EngineSettings) -> Self {
        self.settings = settings;
        self
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub fn progress(&self) -> &ProgressTracker {
        &self.progress
    }

    #[must_use]
    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    #[must_use]
    pub fn phase(&self) -> SessionPhase {
        self.open.as_ref().map_or(SessionPhase::Idle, |open| open.phase)
    }

    #[must_use]
    pub fn session(&self) -> Option<&Session> {
        self.open.as_ref().map(|open| &open.session)
    }

    #[must_use]
    pub fn exercise(&self) -> Option<&Exercise> {
        self.open.as_ref().map(|open| &open.exercise)
    }

    /// Id of the running capture, if any.
    #[must_use]
    pub fn active_capture_id(&self) -> Option<u64> {
        self.open.as_ref()?.capture.as_ref().map(|c| c.id)
    }

    /// When the running capture times out.
    #[must_use]
    pub fn listen_deadline(&self) -> Option<Instant> {
        self.open.as_ref()?.capture.as_ref().map(|c| c.deadline)
    }

    /// Open the catalog exercise `id`, closing any exercise already open.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Catalog` if the id is not in the catalog.
    pub fn start(&mut self, id: &ExerciseId) -> Result<SessionId, SessionError> {
        let catalog = self.progress.catalog();
        let exercise = catalog
            .get_exercise(id)
            .ok_or_else(|| CatalogServiceError::UnknownExercise(id.clone()))?
            .clone();
        Ok(self.start_exercise(exercise))
    }

    /// Open `exercise` at its first step.
    pub fn start_exercise(&mut self, exercise: Exercise) -> SessionId {
        self.exit();
        let capabilities = self.capture.capabilities();
        self.can_play = capabilities.can_speak;
        self.can_record = capabilities.can_listen;

        let session = Session::start(&exercise);
        let session_id = session.id();
        tracing::debug!(
            %session_id,
            exercise_id = %exercise.id(),
            steps = exercise.step_count(),
            "exercise opened"
        );
        self.open = Some(OpenExercise {
            exercise,
            session,
            phase: SessionPhase::StepActive,
            capture: None,
            interim: None,
            notice: None,
        });
        session_id
    }

    /// Close the open exercise without completing it. Returns `false` when idle.
    pub fn exit(&mut self) -> bool {
        let Some(mut open) = self.open.take() else {
            return false;
        };
        open.release_capture();
        tracing::debug!(exercise_id = %open.exercise.id(), "exercise closed");
        true
    }

    /// Speak the current target utterance.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` when no exercise is open or a capture is running.
    pub fn request_prompt(&mut self) -> Result<PromptOutcome, SessionError> {
        let open = require(&mut self.open, SessionAction::RequestPrompt)?;
        if !self.can_play {
            return Ok(PromptOutcome::Unavailable);
        }
        let target = open.target();
        match self.capture.speak(&target, &self.settings.speech) {
            Ok(()) => Ok(PromptOutcome::Spoken),
            Err(CaptureError::Unavailable) => {
                tracing::warn!("speech playback unavailable");
                self.can_play = false;
                Ok(PromptOutcome::Unavailable)
            }
            Err(CaptureError::Failed(reason)) => {
                tracing::warn!(%reason, "prompt playback failed");
                Ok(PromptOutcome::Failed(reason))
            }
        }
    }

    /// Start a capture for the current step.
    ///
    /// A running capture is stopped first and does not count as an attempt.
    /// Previous transcript, feedback and notice are cleared once a capture
    /// is attempted.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` when no exercise is open.
    pub fn begin_listening(&mut self) -> Result<ListenOutcome, SessionError> {
        let open = require(&mut self.open, SessionAction::BeginListening)?;
        if !self.can_record {
            return Ok(ListenOutcome::Unavailable);
        }

        let restarted = match open.capture.take() {
            Some(previous) => {
                tracing::debug!(capture_id = previous.id, "capture superseded");
                previous.stop();
                true
            }
            None => false,
        };
        open.session.clear_attempt_result();
        open.interim = None;
        open.notice = None;

        self.next_capture_id += 1;
        let capture_id = self.next_capture_id;
        let sink = CaptureSink::new(capture_id, self.capture_tx.clone());
        match self.capture.listen(&self.settings.listen_options(), sink) {
            Ok(handle) => {
                open.capture = Some(RunningCapture {
                    id: capture_id,
                    handle,
                    deadline: Instant::now() + self.settings.listen_timeout(),
                });
                open.phase = SessionPhase::Listening;
                tracing::debug!(capture_id, step = open.session.current_step(), "listening");
                Ok(ListenOutcome::Started {
                    capture_id,
                    restarted,
                })
            }
            Err(CaptureError::Unavailable) => {
                tracing::warn!("speech recognition unavailable");
                self.can_record = false;
                open.phase = SessionPhase::StepActive;
                Ok(ListenOutcome::Unavailable)
            }
            Err(CaptureError::Failed(reason)) => {
                tracing::warn!(%reason, "speech recognition refused to start");
                open.notice = Some(CaptureNotice::Failed(reason.clone()));
                open.phase = SessionPhase::StepActive;
                Ok(ListenOutcome::Failed(reason))
            }
        }
    }

    /// Apply an event from the capture channel.
    pub fn handle_capture(&mut self, envelope: CaptureEnvelope) -> CaptureDisposition {
        let Some(open) = self.open.as_mut() else {
            return CaptureDisposition::Stale;
        };
        let current = open.capture.as_ref().map(|c| c.id);
        if open.phase != SessionPhase::Listening || current != Some(envelope.capture_id) {
            tracing::trace!(capture_id = envelope.capture_id, "stale capture event dropped");
            return CaptureDisposition::Stale;
        }

        match envelope.event {
            CaptureEvent::Interim(text) => {
                open.interim = Some(text);
                CaptureDisposition::Interim
            }
            CaptureEvent::Final(text) => {
                let feedback = open.score_transcript(text);
                tracing::debug!(
                    tier = %feedback.tier,
                    similarity = feedback.similarity,
                    attempts = open.session.attempts(),
                    "attempt scored"
                );
                CaptureDisposition::Scored(feedback)
            }
            CaptureEvent::Failed(reason) => {
                tracing::warn!(%reason, "capture failed");
                open.abandon_listen(Some(CaptureNotice::Failed(reason)));
                CaptureDisposition::Failed
            }
        }
    }

    /// Score `text` against the current target.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` unless the machine is `Listening`.
    pub fn on_transcript_final(
        &mut self,
        text: impl Into<String>,
    ) -> Result<Feedback, SessionError> {
        let open = require(&mut self.open, SessionAction::TranscriptFinal)?;
        let feedback = open.score_transcript(text.into());
        tracing::debug!(
            tier = %feedback.tier,
            attempts = open.session.attempts(),
            "attempt scored"
        );
        Ok(feedback)
    }

    /// Cancel the running capture. Counts as an attempt without feedback.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` unless the machine is `Listening`.
    pub fn stop_listening(&mut self) -> Result<(), SessionError> {
        let open = require(&mut self.open, SessionAction::StopListening)?;
        open.abandon_listen(None);
        tracing::debug!(attempts = open.session.attempts(), "listening cancelled");
        Ok(())
    }

    /// Expire capture `capture_id`. Returns `false` if it is no longer current.
    pub fn on_listen_timeout(&mut self, capture_id: u64) -> bool {
        let Some(open) = self.open.as_mut() else {
            return false;
        };
        if open.capture.as_ref().map(|c| c.id) != Some(capture_id) {
            return false;
        }
        tracing::warn!(capture_id, "listen timed out");
        open.abandon_listen(Some(CaptureNotice::TimedOut));
        true
    }

    /// Show or hide the hint; returns the new visibility.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NoHint` if the current step has none.
    pub fn toggle_hint(&mut self) -> Result<bool, SessionError> {
        let open = self.open.as_mut().ok_or(SessionError::NoActiveSession)?;
        let step = open.session.current_step();
        if open.exercise.hint(step).is_none() {
            return Err(SessionError::NoHint { step });
        }
        Ok(open.session.toggle_hint())
    }

    /// Clear the capture notice. Returns `false` if there was none.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NoActiveSession` when idle.
    pub fn dismiss_notice(&mut self) -> Result<bool, SessionError> {
        let open = self.open.as_mut().ok_or(SessionError::NoActiveSession)?;
        Ok(open.notice.take().is_some())
    }

    /// Move to the next step, or complete the exercise from the last one.
    ///
    /// The last step completes only once it was passed or the attempt limit
    /// was reached; otherwise the machine stays where it is.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` when no exercise is open or a capture is running.
    pub fn advance(&mut self) -> Result<AdvanceOutcome, SessionError> {
        let open = require(&mut self.open, SessionAction::Advance)?;
        let step = open.session.current_step();
        if !open.session.is_last_step() {
            open.move_to(step + 1);
            tracing::debug!(step = step + 1, "advanced");
            return Ok(AdvanceOutcome::Moved { step: step + 1 });
        }
        if !open.session.can_finish() {
            let attempts = open.session.attempts();
            tracing::debug!(attempts, "completion blocked");
            return Ok(AdvanceOutcome::Blocked { attempts });
        }

        let completion = self
            .progress
            .record_completion(&open.exercise, self.clock.now());
        tracing::info!(
            exercise_id = %completion.exercise_id,
            points = completion.points,
            first = completion.first_completion,
            "exercise completed"
        );
        self.open = None;
        self.last_completion = Some(completion.clone());
        Ok(AdvanceOutcome::Completed(completion))
    }

    /// Move to the previous step. Returns `false` on the first step.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` when no exercise is open or a capture is running.
    pub fn retreat(&mut self) -> Result<bool, SessionError> {
        let open = require(&mut self.open, SessionAction::Retreat)?;
        let step = open.session.current_step();
        if step == 0 {
            return Ok(false);
        }
        open.move_to(step - 1);
        tracing::debug!(step = step - 1, "went back");
        Ok(true)
    }

    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        let step = self.open.as_ref().map(|open| {
            let session = &open.session;
            StepView {
                session_id: session.id(),
                exercise_id: open.exercise.id().clone(),
                exercise_title: open.exercise.title().to_owned(),
                step_index: session.current_step(),
                step_count: session.step_count(),
                target: open.target(),
                hint: open.hint(),
                hint_visible: session.hint_visible(),
                attempts: session.attempts(),
                is_correct: session.is_correct(),
                feedback: session.feedback().cloned(),
                last_transcript: session.last_transcript().map(str::to_owned),
                interim_transcript: open.interim.clone(),
                notice: open.notice.clone(),
                can_go_back: open.phase.allows(SessionAction::Retreat) && !session.is_first_step(),
                can_advance: open.phase.allows(SessionAction::Advance)
                    && (!session.is_last_step() || session.can_finish()),
            }
        });
        SessionSnapshot {
            phase: self.phase(),
            step,
            can_play: self.can_play,
            can_record: self.can_record,
            advisory: CaptureAdvisory::from_availability(self.can_play, self.can_record),
            last_completion: self.last_completion.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::{
        CaptureCapabilities, CaptureReceiver, ScriptedCapture, capture_channel,
    };
    use crate::catalog_service::CatalogService;
    use speech_core::scoring::Tier;
    use speech_core::time::fixed_now;

    fn machine(capture: &ScriptedCapture) -> (SessionService, CaptureReceiver) {
        let catalog = CatalogService::builtin().unwrap().catalog();
        let (tx, rx) = capture_channel();
        let service = SessionService::new(
            Arc::new(capture.clone()),
            tx,
            ProgressTracker::new(catalog),
        )
        .with_clock(Clock::fixed(fixed_now()));
        (service, rx)
    }

    fn pump(service: &mut SessionService, rx: &mut CaptureReceiver) -> Vec<CaptureDisposition> {
        let mut out = Vec::new();
        while let Ok(envelope) = rx.try_recv() {
            out.push(service.handle_capture(envelope));
        }
        out
    }

    fn say(
        service: &mut SessionService,
        rx: &mut CaptureReceiver,
        capture: &ScriptedCapture,
        text: &str,
    ) -> Feedback {
        capture.push_final(text);
        service.begin_listening().unwrap();
        match pump(service, rx).pop() {
            Some(CaptureDisposition::Scored(feedback)) => feedback,
            other => panic!("expected a scored attempt, got {other:?}"),
        }
    }

    #[test]
    fn consonant_practice_scores_and_advances() {
        let capture = ScriptedCapture::new();
        let (mut service, mut rx) = machine(&capture);
        service.start(&ExerciseId::new("consonant-practice")).unwrap();

        let view = service.snapshot().step.unwrap();
        assert_eq!((view.step_index, view.step_count), (0, 5));
        assert_eq!(view.target, "Park");

        let feedback = say(&mut service, &mut rx, &capture, "park");
        assert_eq!(feedback.tier, Tier::Success);
        assert_eq!(feedback.score, 100);
        assert!((feedback.similarity - 1.0).abs() < f64::EPSILON);
        assert_eq!(service.phase(), SessionPhase::Evaluated);

        let view = service.snapshot().step.unwrap();
        assert!(view.is_correct);
        assert_eq!(view.attempts, 1);
        assert_eq!(view.last_transcript.as_deref(), Some("park"));

        assert_eq!(service.advance().unwrap(), AdvanceOutcome::Moved { step: 1 });
        let view = service.snapshot().step.unwrap();
        assert_eq!(service.phase(), SessionPhase::StepActive);
        assert_eq!(view.target, "Ball");
        assert_eq!(view.attempts, 0);
        assert!(view.feedback.is_none());
        assert!(!view.is_correct);
    }

    #[test]
    fn three_misses_complete_single_step_exercise() {
        let capture = ScriptedCapture::new();
        let (mut service, mut rx) = machine(&capture);
        service.start(&ExerciseId::new("reading-practice")).unwrap();

        for _ in 0..3 {
            let feedback = say(&mut service, &mut rx, &capture, "zzz");
            assert_eq!(feedback.tier, Tier::Retry);
        }

        let AdvanceOutcome::Completed(completion) = service.advance().unwrap() else {
            panic!("expected completion");
        };
        assert_eq!(completion.exercise_id.as_str(), "reading-practice");
        assert_eq!(completion.points, 20);
        assert_eq!(completion.completed_at, fixed_now());
        assert!(completion.first_completion);
        assert_eq!(service.phase(), SessionPhase::Idle);
        assert!(service.progress().is_completed(&completion.exercise_id));
        assert_eq!(service.snapshot().last_completion, Some(completion));
    }

    #[test]
    fn two_misses_keep_last_step_open() {
        let capture = ScriptedCapture::new();
        let (mut service, mut rx) = machine(&capture);
        service.start(&ExerciseId::new("reading-practice")).unwrap();

        say(&mut service, &mut rx, &capture, "zzz");
        say(&mut service, &mut rx, &capture, "zzz");

        assert_eq!(
            service.advance().unwrap(),
            AdvanceOutcome::Blocked { attempts: 2 }
        );
        assert_eq!(service.phase(), SessionPhase::Evaluated);
        assert!(!service.snapshot().step.unwrap().can_advance);
        assert_eq!(service.progress().completed_count(), 0);
    }

    #[test]
    fn cancelled_listens_count_toward_the_limit() {
        let capture = ScriptedCapture::new();
        let (mut service, _rx) = machine(&capture);
        service.start(&ExerciseId::new("reading-practice")).unwrap();

        for _ in 0..3 {
            service.begin_listening().unwrap();
            service.stop_listening().unwrap();
        }
        let view = service.snapshot().step.unwrap();
        assert_eq!(view.attempts, 3);
        assert!(view.feedback.is_none());
        assert_eq!(capture.stop_count(), 3);
        assert!(matches!(
            service.advance().unwrap(),
            AdvanceOutcome::Completed(_)
        ));
    }

    #[test]
    fn restart_drops_events_from_previous_capture() {
        let capture = ScriptedCapture::new();
        let (mut service, mut rx) = machine(&capture);
        service.start(&ExerciseId::new("consonant-practice")).unwrap();

        capture.push_listen(Vec::new());
        let ListenOutcome::Started { capture_id: first, .. } = service.begin_listening().unwrap()
        else {
            panic!("capture should start");
        };
        capture.push_final("park");
        let restarted = service.begin_listening().unwrap();
        assert!(matches!(
            restarted,
            ListenOutcome::Started { restarted: true, .. }
        ));
        assert_eq!(capture.stop_count(), 1);

        let stale = service.handle_capture(CaptureEnvelope {
            capture_id: first,
            event: CaptureEvent::Final("zzz".into()),
        });
        assert_eq!(stale, CaptureDisposition::Stale);
        assert_eq!(service.snapshot().step.unwrap().attempts, 0);

        let results = pump(&mut service, &mut rx);
        assert!(matches!(
            results.as_slice(),
            [CaptureDisposition::Scored(f)] if f.tier == Tier::Success
        ));
        assert_eq!(service.snapshot().step.unwrap().attempts, 1);
    }

    #[test]
    fn interim_transcripts_are_displayed_not_scored() {
        let capture = ScriptedCapture::new();
        let (mut service, mut rx) = machine(&capture);
        service.start(&ExerciseId::new("consonant-practice")).unwrap();

        capture.push_listen(vec![CaptureEvent::Interim("pa".into())]);
        service.begin_listening().unwrap();
        assert_eq!(pump(&mut service, &mut rx), vec![CaptureDisposition::Interim]);

        assert_eq!(service.phase(), SessionPhase::Listening);
        let view = service.snapshot().step.unwrap();
        assert_eq!(view.interim_transcript.as_deref(), Some("pa"));
        assert_eq!(view.attempts, 0);
        assert!(view.feedback.is_none());
    }

    #[test]
    fn capture_failure_counts_attempt_and_sets_notice() {
        let capture = ScriptedCapture::new();
        let (mut service, mut rx) = machine(&capture);
        service.start(&ExerciseId::new("consonant-practice")).unwrap();

        capture.push_listen(vec![CaptureEvent::Failed("network".into())]);
        service.begin_listening().unwrap();
        assert_eq!(pump(&mut service, &mut rx), vec![CaptureDisposition::Failed]);

        assert_eq!(service.phase(), SessionPhase::StepActive);
        let view = service.snapshot().step.unwrap();
        assert_eq!(view.attempts, 1);
        assert!(view.feedback.is_none());
        assert_eq!(view.notice, Some(CaptureNotice::Failed("network".into())));

        assert!(service.dismiss_notice().unwrap());
        assert!(service.snapshot().step.unwrap().notice.is_none());
    }

    #[test]
    fn timeout_behaves_like_cancel() {
        let capture = ScriptedCapture::new();
        let (mut service, _rx) = machine(&capture);
        service.start(&ExerciseId::new("consonant-practice")).unwrap();

        let ListenOutcome::Started { capture_id, .. } = service.begin_listening().unwrap() else {
            panic!("capture should start");
        };
        assert!(service.listen_deadline().is_some());
        assert!(!service.on_listen_timeout(capture_id + 1));
        assert!(service.on_listen_timeout(capture_id));

        assert_eq!(service.phase(), SessionPhase::StepActive);
        assert!(service.listen_deadline().is_none());
        let view = service.snapshot().step.unwrap();
        assert_eq!(view.attempts, 1);
        assert_eq!(view.notice, Some(CaptureNotice::TimedOut));
    }

    #[test]
    fn missing_capabilities_keep_manual_progression() {
        let capture = ScriptedCapture::with_capabilities(CaptureCapabilities::none());
        let (mut service, _rx) = machine(&capture);
        service.start(&ExerciseId::new("consonant-practice")).unwrap();

        assert_eq!(service.begin_listening().unwrap(), ListenOutcome::Unavailable);
        assert_eq!(service.request_prompt().unwrap(), PromptOutcome::Unavailable);
        assert_eq!(service.phase(), SessionPhase::StepActive);

        let snapshot = service.snapshot();
        assert!(!snapshot.can_record);
        assert!(!snapshot.can_play);
        assert_eq!(snapshot.advisory, Some(CaptureAdvisory::SpeechUnavailable));

        assert_eq!(service.advance().unwrap(), AdvanceOutcome::Moved { step: 1 });
        assert!(service.retreat().unwrap());
    }

    #[test]
    fn prompt_speaks_current_target() {
        let capture = ScriptedCapture::new();
        let (mut service, _rx) = machine(&capture);
        service.start(&ExerciseId::new("consonant-practice")).unwrap();
        service.advance().unwrap();

        assert_eq!(service.request_prompt().unwrap(), PromptOutcome::Spoken);
        assert_eq!(capture.spoken(), vec!["Ball".to_owned()]);
    }

    #[test]
    fn listen_uses_engine_settings() {
        let capture = ScriptedCapture::new();
        let (service, _rx) = machine(&capture);
        let mut settings = EngineSettings::default();
        settings.interim_results = false;
        let mut service = service.with_settings(settings);
        service.start(&ExerciseId::new("consonant-practice")).unwrap();
        service.begin_listening().unwrap();

        let options = capture.last_listen_options().unwrap();
        assert_eq!(options.language, "en-US");
        assert!(!options.interim_results);
        assert!(!options.continuous);
    }

    #[test]
    fn transitions_are_checked() {
        let capture = ScriptedCapture::new();
        let (mut service, _rx) = machine(&capture);

        assert!(matches!(
            service.advance(),
            Err(SessionError::NoActiveSession)
        ));

        service.start(&ExerciseId::new("consonant-practice")).unwrap();
        assert!(matches!(
            service.on_transcript_final("park"),
            Err(SessionError::InvalidTransition {
                action: SessionAction::TranscriptFinal,
                phase: SessionPhase::StepActive,
            })
        ));
        assert!(!service.retreat().unwrap());

        service.begin_listening().unwrap();
        assert!(matches!(
            service.advance(),
            Err(SessionError::InvalidTransition {
                action: SessionAction::Advance,
                phase: SessionPhase::Listening,
            })
        ));
        assert!(service.on_transcript_final("Park").is_ok());
    }

    #[test]
    fn hints_toggle_only_where_present() {
        let capture = ScriptedCapture::new();
        let (mut service, _rx) = machine(&capture);
        service.start(&ExerciseId::new("consonant-practice")).unwrap();

        assert!(service.toggle_hint().unwrap());
        let view = service.snapshot().step.unwrap();
        assert_eq!(
            view.visible_hint(),
            Some("Press your lips together, then release a puff of air.")
        );
        assert!(!service.toggle_hint().unwrap());

        service.start(&ExerciseId::new("reading-practice")).unwrap();
        assert!(matches!(
            service.toggle_hint(),
            Err(SessionError::NoHint { step: 0 })
        ));
    }

    #[test]
    fn reopening_a_completed_exercise_starts_fresh() {
        let capture = ScriptedCapture::new();
        let (mut service, mut rx) = machine(&capture);
        let id = ExerciseId::new("reading-practice");

        service.start(&id).unwrap();
        say(
            &mut service,
            &mut rx,
            &capture,
            "The sun was shining brightly in the clear blue sky. Birds were singing in the trees, and flowers were blooming in the garden.",
        );
        assert!(matches!(service.advance().unwrap(), AdvanceOutcome::Completed(_)));

        service.start(&id).unwrap();
        let view = service.snapshot().step.unwrap();
        assert_eq!(view.attempts, 0);
        assert!(view.feedback.is_none());
        assert!(service.progress().is_completed(&id));

        for _ in 0..3 {
            say(&mut service, &mut rx, &capture, "zzz");
        }
        let AdvanceOutcome::Completed(again) = service.advance().unwrap() else {
            panic!("expected completion");
        };
        assert!(!again.first_completion);
        assert_eq!(service.progress().completed_count(), 1);
    }

    #[test]
    fn unknown_exercise_is_rejected() {
        let capture = ScriptedCapture::new();
        let (mut service, _rx) = machine(&capture);
        let err = service.start(&ExerciseId::new("nope")).unwrap_err();
        assert!(matches!(
            err,
            SessionError::Catalog(CatalogServiceError::UnknownExercise(_))
        ));
        assert_eq!(service.phase(), SessionPhase::Idle);
    }
}
