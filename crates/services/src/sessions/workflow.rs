use std::future;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::time::Instant;

use speech_core::model::{ExerciseId, SessionId};
use speech_core::scoring::Feedback;
use storage::repository::CompletionRepository;

use crate::capture::{CaptureEnvelope, CaptureReceiver};
use crate::progress::{ExerciseCompletion, ProgressTracker};

use super::service::{
    AdvanceOutcome, CaptureDisposition, ListenOutcome, PromptOutcome, SessionService,
};
use super::view::SessionSnapshot;

/// UI action delivered to the session loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCommand {
    Start(ExerciseId),
    RequestPrompt,
    BeginListening,
    StopListening,
    ToggleHint,
    DismissNotice,
    Advance,
    Retreat,
    Exit,
    Shutdown,
}

/// What a loop iteration did.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Started(SessionId),
    Prompt(PromptOutcome),
    Listen(ListenOutcome),
    Interim,
    Scored(Feedback),
    CaptureFailed,
    ListenCancelled,
    TimedOut,
    HintToggled { visible: bool },
    NoticeDismissed,
    Advanced(AdvanceOutcome),
    Retreated { moved: bool },
    Exited,
    /// The command was refused; the message is the error text.
    Rejected(String),
}

/// Published after every handled command, capture event or timeout.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionUpdate {
    pub event: SessionEvent,
    pub snapshot: SessionSnapshot,
}

/// Returned when the loop ends.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoopSummary {
    pub commands: usize,
    pub completions: Vec<ExerciseCompletion>,
    pub persisted: usize,
    pub persistence_failures: usize,
}

/// Drives a `SessionService` from a command queue and the capture channel.
#[derive(Clone, Default)]
pub struct SessionLoopService {
    completions: Option<Arc<dyn CompletionRepository>>,
}

impl SessionLoopService {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Also write each completion to `repo`.
    #[must_use]
    pub fn with_completions(mut self, repo: Arc<dyn CompletionRepository>) -> Self {
        self.completions = Some(repo);
        self
    }

    /// Run until `Shutdown` arrives or every command sender is dropped.
    ///
    /// Queued capture events are handled before the next command, so a
    /// transcript delivered during `listen` is scored before the user's
    /// next action. The open exercise is closed on the way out.
    pub async fn run(
        &self,
        mut machine: SessionService,
        mut capture_rx: CaptureReceiver,
        mut commands: mpsc::Receiver<SessionCommand>,
        updates: mpsc::Sender<SessionUpdate>,
    ) -> LoopSummary {
        let mut summary = LoopSummary::default();
        loop {
            let deadline = machine.listen_deadline();
            let event = tokio::select! {
                biased;
                Some(envelope) = capture_rx.recv() => match capture_event(&mut machine, envelope) {
                    Some(event) => event,
                    None => continue,
                },
                () = until(deadline) => {
                    match machine.active_capture_id() {
                        Some(id) if machine.on_listen_timeout(id) => SessionEvent::TimedOut,
                        _ => continue,
                    }
                }
                command = commands.recv() => match command {
                    None | Some(SessionCommand::Shutdown) => break,
                    Some(command) => {
                        summary.commands += 1;
                        let event = apply(&mut machine, command);
                        if let SessionEvent::Advanced(AdvanceOutcome::Completed(completion)) =
                            &event
                        {
                            let progress = machine.progress().clone();
                            self.persist(&progress, completion, &mut summary).await;
                        }
                        event
                    }
                },
            };

            let update = SessionUpdate {
                event,
                snapshot: machine.snapshot(),
            };
            if updates.send(update).await.is_err() {
                tracing::debug!("session updates receiver dropped");
            }
        }

        machine.exit();
        tracing::debug!(commands = summary.commands, "session loop stopped");
        summary
    }

    async fn persist(
        &self,
        progress: &ProgressTracker,
        completion: &ExerciseCompletion,
        summary: &mut LoopSummary,
    ) {
        summary.completions.push(completion.clone());
        let Some(repo) = &self.completions else {
            return;
        };
        match progress.persist(completion, repo.as_ref()).await {
            Ok(_) => summary.persisted += 1,
            Err(err) => {
                summary.persistence_failures += 1;
                tracing::warn!(
                    exercise_id = %completion.exercise_id,
                    error = %err,
                    "failed to persist completion"
                );
            }
        }
    }
}

async fn until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => future::pending().await,
    }
}

/// `None` for events from a superseded capture; nothing is published for those.
fn capture_event(machine: &mut SessionService, envelope: CaptureEnvelope) -> Option<SessionEvent> {
    let event = match machine.handle_capture(envelope) {
        CaptureDisposition::Stale => return None,
        CaptureDisposition::Interim => SessionEvent::Interim,
        CaptureDisposition::Scored(feedback) => SessionEvent::Scored(feedback),
        CaptureDisposition::Failed => SessionEvent::CaptureFailed,
    };
    Some(event)
}

fn apply(machine: &mut SessionService, command: SessionCommand) -> SessionEvent {
    let result = match command {
        SessionCommand::Start(id) => machine.start(&id).map(SessionEvent::Started),
        SessionCommand::RequestPrompt => machine.request_prompt().map(SessionEvent::Prompt),
        SessionCommand::BeginListening => machine.begin_listening().map(SessionEvent::Listen),
        SessionCommand::StopListening => machine
            .stop_listening()
            .map(|()| SessionEvent::ListenCancelled),
        SessionCommand::ToggleHint => machine
            .toggle_hint()
            .map(|visible| SessionEvent::HintToggled { visible }),
        SessionCommand::DismissNotice => machine
            .dismiss_notice()
            .map(|_| SessionEvent::NoticeDismissed),
        SessionCommand::Advance => machine.advance().map(SessionEvent::Advanced),
        SessionCommand::Retreat => machine
            .retreat()
            .map(|moved| SessionEvent::Retreated { moved }),
        SessionCommand::Exit => {
            machine.exit();
            Ok(SessionEvent::Exited)
        }
        SessionCommand::Shutdown => Ok(SessionEvent::Exited),
    };
    result.unwrap_or_else(|err| {
        tracing::debug!(error = %err, "command rejected");
        SessionEvent::Rejected(err.to_string())
    })
}
