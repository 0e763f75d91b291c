use thiserror::Error;
use tokio::sync::mpsc;

use crate::api::attempts::AttemptsApi;
use crate::api::errors::ApiError;
use crate::api::exams::ExamsApi;
use crate::attempt::answers::AnswerBuffer;
use crate::attempt::countdown::{spawn_countdown, CountdownEvent};
use crate::schemas::attempt::Attempt;
use crate::schemas::exam::Exam;

/// Why a session could not be brought up. Distinguishes "exam not found"
/// from generic load failure so the front end can phrase it.
#[derive(Debug, Error)]
pub(crate) enum SessionError {
    #[error("exam not found")]
    ExamNotFound,
    #[error("exam has no questions")]
    EmptyExam,
    #[error("failed to load exam: {0}")]
    Load(ApiError),
    #[error("failed to start attempt: {0}")]
    Start(ApiError),
}

/// Front-end actions during an attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum SessionCommand {
    SelectAnswer { question: usize, option: i32 },
    Submit,
    Quit,
}

/// What the session pushes back to the front end.
#[derive(Debug)]
pub(crate) enum SessionSignal {
    Tick { remaining: u64 },
    Progress { answered: usize, total: usize, percent: f64, complete: bool },
    SubmissionFailed { message: String },
    Completed(Box<Attempt>),
}

/// One in-progress exam attempt: the exam snapshot, the local answer buffer,
/// the attempt identity, and the submitted guard. Ephemeral by design — the
/// process losing this state loses the in-progress answers.
#[derive(Debug)]
pub(crate) struct AttemptSession {
    exam: Exam,
    attempt_id: String,
    answers: AnswerBuffer,
    remaining: u64,
    submitted: bool,
    api: AttemptsApi,
}

impl AttemptSession {
    /// Loads the exam, checks it is usable, and only then asks the server
    /// for an attempt — an exam with zero questions never consumes a
    /// server-side attempt slot.
    pub(crate) async fn begin(
        exams: &ExamsApi,
        attempts: AttemptsApi,
        exam_id: &str,
    ) -> Result<Self, SessionError> {
        let exam = exams.fetch(exam_id).await.map_err(|err| match err {
            ApiError::NotFound(_) => SessionError::ExamNotFound,
            other => SessionError::Load(other),
        })?;

        if exam.questions.is_empty() {
            tracing::warn!(exam_id, "Refusing to start attempt for exam without questions");
            return Err(SessionError::EmptyExam);
        }

        let answers = AnswerBuffer::for_exam(&exam);
        let attempt = attempts.start(exam_id).await.map_err(SessionError::Start)?;
        let remaining = exam.duration_seconds();

        tracing::info!(
            exam_id,
            attempt_id = %attempt.id,
            questions = exam.questions.len(),
            remaining,
            "Attempt session started"
        );

        Ok(Self { exam, attempt_id: attempt.id, answers, remaining, submitted: false, api: attempts })
    }

    pub(crate) fn exam(&self) -> &Exam {
        &self.exam
    }

    pub(crate) fn attempt_id(&self) -> &str {
        &self.attempt_id
    }

    pub(crate) fn answers(&self) -> &AnswerBuffer {
        &self.answers
    }

    pub(crate) fn remaining(&self) -> u64 {
        self.remaining
    }

    pub(crate) fn select_answer(&mut self, question: usize, option: i32) {
        if question >= self.answers.len() {
            tracing::warn!(question, "Ignoring answer for unknown question index");
            return;
        }
        self.answers.set(question, option);
    }

    pub(crate) fn note_remaining(&mut self, remaining: u64) {
        self.remaining = remaining;
    }

    /// Submits the buffer once. The guard flips before the network call and
    /// only rolls back on failure, so a second trigger arriving while the
    /// first is in flight (or after success) never reaches the server.
    /// Returns `Ok(None)` when the submission was already taken.
    pub(crate) async fn try_submit(&mut self) -> Result<Option<Attempt>, ApiError> {
        if self.submitted {
            return Ok(None);
        }
        self.submitted = true;

        match self.api.submit(&self.attempt_id, self.answers.answers()).await {
            Ok(attempt) => Ok(Some(attempt)),
            Err(err) => {
                // Best-effort delivery: allow the user (or a late trigger)
                // one more try.
                self.submitted = false;
                Err(err)
            }
        }
    }
}

/// Drives a session to completion: one task consuming front-end commands and
/// timer events, which serializes every mutation and makes the
/// submit-vs-expiry race collapse into "first caller wins".
///
/// Returns the completed attempt, or `None` when the user quit. Dropping out
/// of this function cancels the countdown via the handle's Drop.
pub(crate) async fn run_session(
    mut session: AttemptSession,
    mut commands: mpsc::Receiver<SessionCommand>,
    signals: mpsc::Sender<SessionSignal>,
) -> Option<Attempt> {
    let (countdown, mut timer_events) = spawn_countdown(session.remaining());
    let mut timer_done = false;

    loop {
        tokio::select! {
            command = commands.recv() => match command {
                Some(SessionCommand::SelectAnswer { question, option }) => {
                    session.select_answer(question, option);
                    let answers = session.answers();
                    let _ = signals.try_send(SessionSignal::Progress {
                        answered: answers.answered_count(),
                        total: answers.len(),
                        percent: answers.completion_percent(),
                        complete: answers.is_complete(),
                    });
                }
                Some(SessionCommand::Submit) => {
                    if let Some(attempt) = submit_once(&mut session, &signals).await {
                        countdown.cancel();
                        return Some(attempt);
                    }
                }
                Some(SessionCommand::Quit) | None => {
                    tracing::debug!(attempt_id = %session.attempt_id(), "Session torn down");
                    countdown.cancel();
                    return None;
                }
            },
            event = timer_events.recv(), if !timer_done => match event {
                Some(CountdownEvent::Tick { remaining }) => {
                    session.note_remaining(remaining);
                    let _ = signals.try_send(SessionSignal::Tick { remaining });
                }
                Some(CountdownEvent::Expired) => {
                    session.note_remaining(0);
                    tracing::info!(attempt_id = %session.attempt_id(), "Time expired, auto-submitting");
                    if let Some(attempt) = submit_once(&mut session, &signals).await {
                        return Some(attempt);
                    }
                }
                // Timer ended (expired earlier or cancelled); commands keep
                // the session alive for a manual retry.
                None => timer_done = true,
            },
        }
    }
}

async fn submit_once(
    session: &mut AttemptSession,
    signals: &mpsc::Sender<SessionSignal>,
) -> Option<Attempt> {
    match session.try_submit().await {
        Ok(Some(attempt)) => {
            let _ = signals.send(SessionSignal::Completed(Box::new(attempt.clone()))).await;
            Some(attempt)
        }
        Ok(None) => None,
        Err(err) => {
            tracing::error!(error = %err, attempt_id = %session.attempt_id(), "Submission failed");
            let _ = signals
                .send(SessionSignal::SubmissionFailed { message: err.user_message() })
                .await;
            None
        }
    }
}
