//! Proctoring state machine
//!
//! This module contains the [`Monitor`], which drives a single quiz attempt
//! through `NotStarted → Active → Submitted`. While active, every attempt
//! to leave the quiz context raises the warning count, notifies the user,
//! and arms a grace timer; prolonged absence keeps counting as further
//! violations. Exhausting the warnings forces a submission.
//!
//! The monitor owns no timers and performs no I/O. Alarms are requested
//! through a scheduling closure and handed back through
//! [`Monitor::receive_alarm`]; submissions are returned to the host as
//! [`Submission`] values and their outcome reported back through
//! [`Monitor::finish_submission`] (or both at once via [`Monitor::settle`]).

use garde::Validate;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use thiserror::Error;
use tracing::{debug, error, info, warn};
use web_time::Duration;

use crate::{
    attempt::{self, Answers, QuizAttempt, ViolationKind},
    constants::proctor::{GRACE_PERIOD, MAX_WARNINGS, MODAL_DISMISS},
    notification::Notification,
    quiz::Quiz,
    session::{Environment, EnvironmentEvent, SessionContext, Surface},
    submission::{SubmitError, Submission, Submitter},
};

/// Shown when the environment has no full-screen capability
pub const FULLSCREEN_UNSUPPORTED: &str = "Full-screen mode is not supported in this browser.";
/// Shown when entering full-screen at the start of the quiz fails
pub const FULLSCREEN_DENIED: &str = "Unable to enter full-screen mode. Please enable it manually.";
/// Shown when returning to full-screen after a warning fails
pub const FULLSCREEN_REENTRY_DENIED: &str =
    "Unable to re-enter full-screen mode. Please enable it manually.";
/// Shown when a manual submission is attempted with unanswered questions
pub const UNANSWERED_QUESTIONS: &str = "Please answer all questions before submitting.";
/// Warning issued when only one warning remains
pub const FINAL_WARNING: &str = "You have 1 warning left. The quiz will be automatically submitted if you trigger another warning.";
/// Spoken once the quiz has been submitted
pub const SUBMITTED_SPEECH: &str = "Quiz submitted!";

/// The lifecycle phase of an attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    /// The quiz has not been started yet
    NotStarted,
    /// The quiz is being taken and monitored
    Active,
    /// The quiz was submitted successfully; nothing changes anymore
    Submitted,
}

/// Alarm messages for timed proctoring events
///
/// Each alarm carries the token it was scheduled with. An alarm whose
/// token is no longer current belongs to a cancelled timer and is ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlarmMessage {
    /// The grace period after a violation has elapsed
    GraceExpired {
        /// Token of the grace timer
        token: u64,
    },
    /// The warning modal should close on its own
    DismissModal {
        /// Token of the modal
        token: u64,
    },
}

/// Update messages describing changes to the attempt
#[serde_with::serde_as]
#[skip_serializing_none]
#[derive(Debug, Serialize, Clone, PartialEq)]
pub enum UpdateMessage {
    /// The quiz became active and its questions can be answered
    Started,
    /// An answer was selected for a question
    AnswerSelected {
        /// Index of the question
        index: usize,
        /// The selected option
        option: String,
    },
    /// The warning modal opened
    WarningModal {
        /// Description of the violation
        message: String,
        /// The warning count after the violation
        warning_count: usize,
        /// Warnings remaining before automatic submission
        warnings_left: usize,
        /// Whether the next violation submits the quiz
        final_warning: bool,
        /// Time after which the modal closes on its own
        #[serde_as(as = "serde_with::DurationMilliSeconds<u64>")]
        duration: Duration,
    },
    /// The warning modal closed
    ModalDismissed,
    /// The result banner changed
    Result(String),
    /// The quiz was submitted successfully
    Submitted {
        /// The submitted score
        score: u64,
    },
}

/// A question as presented to the user, without its correct answer
#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub struct QuestionView {
    /// The question prompt
    pub question_text: String,
    /// The options to choose from
    pub options: Vec<String>,
}

/// Full snapshot of the quiz view
#[skip_serializing_none]
#[derive(Debug, Serialize, Clone, PartialEq)]
pub enum SyncMessage {
    /// The start screen
    NotStarted {
        /// Title of the quiz
        title: String,
        /// Description of the quiz
        description: String,
    },
    /// The quiz is being taken
    Active {
        /// Title of the quiz
        title: String,
        /// Description of the quiz
        description: String,
        /// The questions, in display order
        questions: Vec<QuestionView>,
        /// The answers selected so far
        answers: Answers,
        /// The current warning count
        warning_count: usize,
        /// Warnings remaining before automatic submission
        warnings_left: usize,
        /// Text of the warning modal, if open
        modal: Option<String>,
        /// The last submission result, if a submission failed
        result: Option<String>,
    },
    /// The quiz was submitted
    Submitted {
        /// Title of the quiz
        title: String,
        /// Description of the quiz
        description: String,
        /// The submitted score
        score: u64,
        /// The result banner
        result: String,
    },
}

/// Errors returned by monitor operations
#[derive(Error, Serialize, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The quiz has not been started
    #[error("quiz has not been started")]
    NotStarted,
    /// The quiz has already been submitted
    #[error("quiz has already been submitted")]
    AlreadySubmitted,
    /// A submission is waiting for its outcome
    #[error("a submission is already in flight")]
    SubmissionInFlight,
    /// Some questions have no selected answer
    #[error("questions {0:?} are unanswered")]
    Unanswered(Vec<usize>),
    /// The answer could not be selected
    #[error(transparent)]
    Selection(#[from] attempt::Error),
    /// The quiz definition is invalid
    #[error("invalid quiz: {0}")]
    InvalidQuiz(String),
}

#[derive(Debug, Clone)]
struct Modal {
    token: u64,
    message: String,
}

#[derive(Debug, Clone, Copy)]
struct InFlight {
    sequence: u64,
    forced: bool,
}

/// Builds the warning text for a violation that raised the count to `warning_count`
pub fn warning_message(kind: ViolationKind, warning_count: usize) -> String {
    if warning_count == MAX_WARNINGS - 1 {
        return FINAL_WARNING.to_owned();
    }

    let lead = match kind {
        ViolationKind::FullscreenExit => {
            "You tried to exit full-screen mode. Please stay in full-screen mode to continue the quiz."
        }
        ViolationKind::TabHidden => {
            "You tried to switch tabs. Please stay on this tab to continue the quiz."
        }
        ViolationKind::GraceExpired => {
            "You did not return to the quiz in time. Please stay in full-screen mode on this tab."
        }
    };

    format!(
        "{lead} You have {} warnings left.",
        MAX_WARNINGS.saturating_sub(warning_count)
    )
}

/// Monitors a single quiz attempt
///
/// The monitor is owned by the quiz view for its lifetime. Every transition
/// runs to completion on the caller's thread; the only asynchronous step,
/// submitting the score, is performed by the host between
/// [`Monitor::submit`] (or a forced submission) and
/// [`Monitor::finish_submission`].
#[derive(Debug)]
pub struct Monitor {
    quiz: Quiz,
    session: SessionContext,
    attempt: QuizAttempt,
    started: bool,
    fullscreen_supported: bool,
    modal: Option<Modal>,
    modal_tokens: u64,
    submissions: u64,
    in_flight: Option<InFlight>,
    forced_pending: bool,
    score: Option<u64>,
    result: Option<String>,
}

impl Monitor {
    /// Creates a monitor for `quiz`, taken by the user in `session`
    pub fn new(quiz: Quiz, session: SessionContext) -> Self {
        Self {
            quiz,
            session,
            attempt: QuizAttempt::new(),
            started: false,
            fullscreen_supported: false,
            modal: None,
            modal_tokens: 0,
            submissions: 0,
            in_flight: None,
            forced_pending: false,
            score: None,
            result: None,
        }
    }

    /// Creates a monitor after validating the quiz definition
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidQuiz`] if the quiz violates its limits.
    pub fn validated(quiz: Quiz, session: SessionContext) -> Result<Self, Error> {
        quiz.validate()
            .map_err(|e| Error::InvalidQuiz(e.to_string()))?;
        Ok(Self::new(quiz, session))
    }

    /// Returns the quiz being taken
    pub fn quiz(&self) -> &Quiz {
        &self.quiz
    }

    /// Returns the session the quiz is taken in
    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    /// Returns the attempt state
    pub fn attempt(&self) -> &QuizAttempt {
        &self.attempt
    }

    /// Returns the lifecycle phase of the attempt
    pub fn phase(&self) -> Phase {
        if self.attempt.is_submitted() {
            Phase::Submitted
        } else if self.started {
            Phase::Active
        } else {
            Phase::NotStarted
        }
    }

    /// Returns whether the warning modal is open
    pub fn is_modal_open(&self) -> bool {
        self.modal.is_some()
    }

    /// Returns whether a submission is waiting for its outcome
    pub fn submission_in_flight(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Returns the submitted score, once the attempt is submitted
    pub fn score(&self) -> Option<u64> {
        self.score
    }

    /// Returns the current result banner, if any
    pub fn result(&self) -> Option<&str> {
        self.result.as_deref()
    }

    /// Starts the quiz and enters full-screen mode
    ///
    /// The quiz starts even when full-screen mode is unavailable or refused;
    /// the user is told so. Listeners are attached on entry. Starting an
    /// attempt that is already started does nothing.
    pub fn start<E: Environment, U: Surface>(&mut self, env: &mut E, surface: &U) {
        if self.started {
            return;
        }

        self.started = true;
        self.attempt.mark_started();
        self.fullscreen_supported = env.fullscreen_supported();

        if self.fullscreen_supported {
            match env.request_fullscreen() {
                Ok(()) => self.attempt.set_fullscreen(true),
                Err(e) => {
                    error!(attempt = %self.attempt.id(), "error attempting to enable full-screen mode: {e}");
                    surface.send_message(&Notification::error(FULLSCREEN_DENIED).into());
                }
            }
        } else {
            warn!(attempt = %self.attempt.id(), "full-screen mode is not supported");
            surface.send_message(&Notification::error(FULLSCREEN_UNSUPPORTED).into());
        }

        env.attach_listeners();

        info!(
            attempt = %self.attempt.id(),
            quiz = %self.quiz.id,
            user = %self.session.user_id,
            "quiz started"
        );
        surface.send_message(&UpdateMessage::Started.into());
    }

    /// Selects `option` as the answer to the question at `index`
    ///
    /// # Errors
    ///
    /// Returns an error if the quiz is not active or the selection is not
    /// valid for the quiz.
    pub fn select_answer<U: Surface>(
        &mut self,
        index: usize,
        option: &str,
        surface: &U,
    ) -> Result<(), Error> {
        match self.phase() {
            Phase::NotStarted => return Err(Error::NotStarted),
            Phase::Submitted => return Err(Error::AlreadySubmitted),
            Phase::Active => {}
        }

        self.attempt.select(&self.quiz, index, option)?;

        surface.send_message(
            &UpdateMessage::AnswerSelected {
                index,
                option: option.to_owned(),
            }
            .into(),
        );

        Ok(())
    }

    /// Handles an event delivered by the environment
    ///
    /// Leaving full-screen mode or hiding the page while the quiz is active
    /// is a violation. Returns a forced [`Submission`] when the violation
    /// exhausts the warnings.
    ///
    /// # Arguments
    ///
    /// * `event` - The environment event
    /// * `env` - The environment the event came from
    /// * `schedule_message` - Function to schedule delayed alarms
    /// * `surface` - Where user-facing output is sent
    pub fn receive_event<
        E: Environment,
        S: FnMut(AlarmMessage, Duration),
        U: Surface,
    >(
        &mut self,
        event: EnvironmentEvent,
        env: &mut E,
        schedule_message: S,
        surface: &U,
    ) -> Option<Submission> {
        if self.phase() != Phase::Active {
            return None;
        }

        match event {
            EnvironmentEvent::FullscreenChanged { active } => {
                self.attempt.set_fullscreen(active);
                if active {
                    None
                } else {
                    self.violation(ViolationKind::FullscreenExit, env, schedule_message, surface)
                }
            }
            EnvironmentEvent::VisibilityChanged { hidden } => {
                self.attempt.set_hidden(hidden);
                if hidden {
                    self.violation(ViolationKind::TabHidden, env, schedule_message, surface)
                } else {
                    None
                }
            }
        }
    }

    /// Handles a scheduled alarm
    ///
    /// A grace timer that expires while the user is still outside the quiz
    /// context counts as another violation. Alarms of cancelled timers are
    /// ignored. Returns a forced [`Submission`] when the warnings are
    /// exhausted.
    ///
    /// # Arguments
    ///
    /// * `message` - The alarm that fired
    /// * `env` - The environment being monitored
    /// * `schedule_message` - Function to schedule delayed alarms
    /// * `surface` - Where user-facing output is sent
    pub fn receive_alarm<
        E: Environment,
        S: FnMut(AlarmMessage, Duration),
        U: Surface,
    >(
        &mut self,
        message: AlarmMessage,
        env: &mut E,
        schedule_message: S,
        surface: &U,
    ) -> Option<Submission> {
        match message {
            AlarmMessage::GraceExpired { token } => {
                if !self.attempt.take_grace(token) || self.phase() != Phase::Active {
                    return None;
                }

                if self.attempt.is_compliant(self.fullscreen_supported) {
                    debug!(attempt = %self.attempt.id(), "returned to the quiz within the grace period");
                    return None;
                }

                self.violation(ViolationKind::GraceExpired, env, schedule_message, surface)
            }
            AlarmMessage::DismissModal { token } => {
                if self.modal.as_ref().is_some_and(|modal| modal.token == token) {
                    self.close_modal(surface);
                }
                None
            }
        }
    }

    /// Closes the warning modal at the user's request
    ///
    /// Closing the modal also asks the environment to return to full-screen
    /// mode.
    pub fn dismiss_modal<E: Environment, U: Surface>(&mut self, env: &mut E, surface: &U) {
        if self.modal.is_none() {
            return;
        }

        self.close_modal(surface);

        if self.phase() == Phase::Active {
            self.reenter_fullscreen(env, surface);
        }
    }

    /// Requests a manual submission
    ///
    /// Every question must have a selected answer. On success the returned
    /// [`Submission`] must be delivered by the host and its outcome passed
    /// to [`Monitor::finish_submission`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Unanswered`] (and notifies the user) if any question
    /// is unanswered, or a lifecycle error if the quiz is not active or a
    /// submission is in flight. No state changes in either case.
    pub fn submit<U: Surface>(&mut self, surface: &U) -> Result<Submission, Error> {
        match self.phase() {
            Phase::NotStarted => return Err(Error::NotStarted),
            Phase::Submitted => return Err(Error::AlreadySubmitted),
            Phase::Active => {}
        }

        if self.in_flight.is_some() {
            return Err(Error::SubmissionInFlight);
        }

        let unanswered = self.quiz.unanswered(self.attempt.answers());
        if !unanswered.is_empty() {
            debug!(
                attempt = %self.attempt.id(),
                unanswered = %unanswered.iter().join(","),
                "manual submission rejected"
            );
            surface.send_message(&Notification::error(UNANSWERED_QUESTIONS).into());
            return Err(Error::Unanswered(unanswered));
        }

        Ok(self.issue_submission(false))
    }

    /// Applies the outcome of a submission
    ///
    /// On success the attempt becomes submitted: the grace timer is
    /// cancelled, the modal closed, and the environment listeners detached.
    /// On failure the attempt stays active and the user is told why.
    /// Outcomes of stale submissions are ignored.
    ///
    /// If the warnings ran out while a manual submission was in flight and
    /// that submission failed, the forced [`Submission`] is returned and
    /// must be delivered like any other.
    pub fn finish_submission<E: Environment, U: Surface>(
        &mut self,
        submission: &Submission,
        outcome: Result<(), SubmitError>,
        env: &mut E,
        surface: &U,
    ) -> Option<Submission> {
        let current = self
            .in_flight
            .is_some_and(|pending| pending.sequence == submission.sequence);
        if submission.attempt_id != self.attempt.id() || !current || self.phase() != Phase::Active
        {
            return None;
        }

        self.in_flight = None;

        match outcome {
            Ok(()) => {
                self.attempt.mark_submitted();
                self.score = Some(submission.score);
                env.detach_listeners();

                if self.modal.take().is_some() {
                    surface.send_message(&UpdateMessage::ModalDismissed.into());
                }

                let result = format!("Quiz submitted! Your score: {}", submission.score);
                info!(
                    attempt = %self.attempt.id(),
                    score = submission.score,
                    forced = submission.forced,
                    "quiz submitted"
                );

                surface.send_message(&Notification::success(result.clone()).into());
                surface.send_message(
                    &UpdateMessage::Submitted {
                        score: submission.score,
                    }
                    .into(),
                );
                self.forced_pending = false;
                self.set_result(result, surface);
                self.speak(env, SUBMITTED_SPEECH);
                None
            }
            Err(e) => {
                warn!(
                    attempt = %self.attempt.id(),
                    forced = submission.forced,
                    "submission failed: {e}"
                );

                let message = e.user_message().to_owned();
                surface.send_message(&Notification::error(message.clone()).into());
                self.set_result(message, surface);

                if !std::mem::take(&mut self.forced_pending) {
                    return None;
                }
                info!(attempt = %self.attempt.id(), "warnings exhausted, submitting automatically");
                Some(self.issue_submission(true))
            }
        }
    }

    /// Delivers `submission` through `submitter` and applies the outcome
    ///
    /// A forced submission that follows from the outcome is delivered too.
    pub async fn settle<T: Submitter, E: Environment, U: Surface>(
        &mut self,
        submission: Submission,
        submitter: &T,
        env: &mut E,
        surface: &U,
    ) {
        let mut next = Some(submission);
        while let Some(submission) = next {
            let outcome = submitter.submit(&submission).await;
            next = self.finish_submission(&submission, outcome, env, surface);
        }
    }

    /// Returns the message necessary to render the whole view
    pub fn state_message(&self) -> SyncMessage {
        let title = self.quiz.title.clone();
        let description = self.quiz.description.clone();

        match self.phase() {
            Phase::NotStarted => SyncMessage::NotStarted { title, description },
            Phase::Active => SyncMessage::Active {
                title,
                description,
                questions: self
                    .quiz
                    .questions
                    .iter()
                    .map(|q| QuestionView {
                        question_text: q.question_text.clone(),
                        options: q.options.clone(),
                    })
                    .collect_vec(),
                answers: self.attempt.answers().clone(),
                warning_count: self.attempt.warning_count(),
                warnings_left: self.attempt.warnings_left(),
                modal: self.modal.as_ref().map(|modal| modal.message.clone()),
                result: self.result.clone(),
            },
            Phase::Submitted => SyncMessage::Submitted {
                title,
                description,
                score: self.score.unwrap_or_default(),
                result: self.result.clone().unwrap_or_default(),
            },
        }
    }

    /// Sends the current view snapshot to `surface`
    pub fn update_session<U: Surface>(&self, surface: &U) {
        surface.send_state(&self.state_message());
    }

    fn violation<E: Environment, S: FnMut(AlarmMessage, Duration), U: Surface>(
        &mut self,
        kind: ViolationKind,
        env: &mut E,
        mut schedule_message: S,
        surface: &U,
    ) -> Option<Submission> {
        let warning_count = self.attempt.record_violation(kind);
        let message = warning_message(kind, warning_count);

        warn!(
            attempt = %self.attempt.id(),
            ?kind,
            warning_count,
            "proctoring violation"
        );

        surface.send_message(&Notification::warning(message.clone()).into());
        self.speak(env, &message);

        if self.attempt.warnings_exhausted() {
            if let Some(pending) = self.in_flight {
                if !pending.forced {
                    debug!(attempt = %self.attempt.id(), "warnings exhausted during a manual submission");
                    self.forced_pending = true;
                }
                return None;
            }
            info!(attempt = %self.attempt.id(), "warnings exhausted, submitting automatically");
            return Some(self.issue_submission(true));
        }

        self.open_modal(message, &mut schedule_message, surface);

        if kind == ViolationKind::FullscreenExit {
            self.reenter_fullscreen(env, surface);
        }

        let token = self.attempt.arm_grace();
        schedule_message(AlarmMessage::GraceExpired { token }, GRACE_PERIOD);

        None
    }

    fn issue_submission(&mut self, forced: bool) -> Submission {
        self.submissions += 1;
        let sequence = self.submissions;
        self.in_flight = Some(InFlight { sequence, forced });

        Submission {
            attempt_id: self.attempt.id(),
            sequence,
            quiz_id: self.quiz.id.clone(),
            user_id: self.session.user_id.clone(),
            token: self.session.token.clone(),
            score: self.quiz.score(self.attempt.answers()),
            forced,
        }
    }

    fn open_modal<S: FnMut(AlarmMessage, Duration), U: Surface>(
        &mut self,
        message: String,
        mut schedule_message: S,
        surface: &U,
    ) {
        self.modal_tokens += 1;
        let token = self.modal_tokens;

        surface.send_message(
            &UpdateMessage::WarningModal {
                message: message.clone(),
                warning_count: self.attempt.warning_count(),
                warnings_left: self.attempt.warnings_left(),
                final_warning: self.attempt.warnings_left() == 1,
                duration: MODAL_DISMISS,
            }
            .into(),
        );
        self.modal = Some(Modal { token, message });

        schedule_message(AlarmMessage::DismissModal { token }, MODAL_DISMISS);
    }

    fn close_modal<U: Surface>(&mut self, surface: &U) {
        if self.modal.take().is_some() {
            surface.send_message(&UpdateMessage::ModalDismissed.into());
        }
    }

    fn reenter_fullscreen<E: Environment, U: Surface>(&mut self, env: &mut E, surface: &U) {
        match env.request_fullscreen() {
            Ok(()) => self.attempt.set_fullscreen(true),
            Err(e) => {
                error!(attempt = %self.attempt.id(), "error attempting to re-enable full-screen mode: {e}");
                surface.send_message(&Notification::error(FULLSCREEN_REENTRY_DENIED).into());
            }
        }
    }

    fn speak<E: Environment>(&self, env: &mut E, message: &str) {
        if !env.speech_available() {
            return;
        }
        if let Err(e) = env.speak(message) {
            debug!(attempt = %self.attempt.id(), "speech synthesis failed: {e}");
        }
    }

    fn set_result<U: Surface>(&mut self, result: String, surface: &U) {
        surface.send_message(&UpdateMessage::Result(result.clone()).into());
        self.result = Some(result);
    }
}
