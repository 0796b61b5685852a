//! Quiz attempt state
//!
//! This module holds the transient state of a single proctored attempt:
//! the selected answers, the warning counter, the last known environment
//! state, and the bookkeeping for the single grace timer. It enforces the
//! data invariants of an attempt; the transitions themselves live in
//! [`crate::proctor`].

use std::{collections::HashMap, fmt::Display, str::FromStr};

use enum_map::{Enum, EnumMap};
use serde::{Deserialize, Serialize};
use serde_with::{DeserializeFromStr, SerializeDisplay};
use thiserror::Error;
use uuid::Uuid;
use web_time::SystemTime;

use crate::quiz::Quiz;

/// Selected answers, keyed by question index
pub type Answers = HashMap<usize, String>;

/// A unique identifier for an attempt, used to correlate log events
#[derive(
    Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, DeserializeFromStr, SerializeDisplay,
)]
pub struct AttemptId(Uuid);

impl AttemptId {
    /// Creates a new random attempt ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for AttemptId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for AttemptId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for AttemptId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::from_str(s)?))
    }
}

/// The ways a user can leave the proctored context
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Enum, Serialize, Deserialize)]
pub enum ViolationKind {
    /// The page left full-screen mode
    FullscreenExit,
    /// The page was hidden, typically by switching tabs or windows
    TabHidden,
    /// The grace period elapsed without the user returning
    GraceExpired,
}

/// A recorded violation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Violation {
    /// What triggered the violation
    pub kind: ViolationKind,
    /// When the violation was recorded
    pub at: SystemTime,
    /// The warning count after this violation
    pub warning_count: usize,
}

/// Errors that can occur when selecting an answer
#[derive(Error, Serialize, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The question index does not exist in the quiz
    #[error("question {0} does not exist")]
    QuestionOutOfRange(usize),
    /// The option is not offered by the question
    #[error("option is not offered by question {0}")]
    UnknownOption(usize),
    /// The attempt has already been submitted
    #[error("attempt has already been submitted")]
    Submitted,
}

/// The state of a single quiz attempt
///
/// Once `is_submitted` is set it is never cleared, and nothing else about
/// the attempt changes afterwards.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QuizAttempt {
    id: AttemptId,
    answers: Answers,
    is_submitted: bool,
    /// Always within `[0, MAX_WARNINGS]`
    warning_count: usize,
    is_fullscreen: bool,
    is_hidden: bool,
    /// Token of the one live grace timer, if any
    pending_grace: Option<u64>,
    /// Last token handed out for a grace timer
    grace_tokens: u64,
    tallies: EnumMap<ViolationKind, usize>,
    violations: Vec<Violation>,
    started_at: Option<SystemTime>,
}

impl QuizAttempt {
    /// Creates a fresh attempt with no answers and no warnings
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the attempt's identifier
    pub fn id(&self) -> AttemptId {
        self.id
    }

    /// Returns the selected answers
    pub fn answers(&self) -> &Answers {
        &self.answers
    }

    /// Returns whether the attempt has been submitted successfully
    pub fn is_submitted(&self) -> bool {
        self.is_submitted
    }

    /// Returns the current warning count
    pub fn warning_count(&self) -> usize {
        self.warning_count
    }

    /// Returns how many warnings remain before automatic submission
    pub fn warnings_left(&self) -> usize {
        crate::constants::proctor::MAX_WARNINGS - self.warning_count
    }

    /// Returns whether the warning count has reached its limit
    pub fn warnings_exhausted(&self) -> bool {
        self.warning_count >= crate::constants::proctor::MAX_WARNINGS
    }

    /// Returns whether the page is known to be in full-screen mode
    pub fn is_fullscreen(&self) -> bool {
        self.is_fullscreen
    }

    /// Returns whether the page is known to be hidden
    pub fn is_hidden(&self) -> bool {
        self.is_hidden
    }

    /// Returns the time the attempt became active, if it has
    pub fn started_at(&self) -> Option<SystemTime> {
        self.started_at
    }

    /// Returns all recorded violations, oldest first
    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    /// Returns how many violations of `kind` were recorded
    pub fn violation_count(&self, kind: ViolationKind) -> usize {
        self.tallies[kind]
    }

    /// Returns the token of the pending grace timer, if any
    pub fn pending_grace(&self) -> Option<u64> {
        self.pending_grace
    }

    pub(crate) fn mark_started(&mut self) {
        self.started_at = Some(SystemTime::now());
    }

    pub(crate) fn set_fullscreen(&mut self, is_fullscreen: bool) {
        self.is_fullscreen = is_fullscreen;
    }

    pub(crate) fn set_hidden(&mut self, is_hidden: bool) {
        self.is_hidden = is_hidden;
    }

    /// Checks whether the user is currently inside the proctored context
    ///
    /// Full-screen only counts when the environment supports it at all.
    pub fn is_compliant(&self, fullscreen_supported: bool) -> bool {
        !self.is_hidden && (self.is_fullscreen || !fullscreen_supported)
    }

    /// Records an answer for the question at `index`
    ///
    /// A later selection for the same question replaces the earlier one.
    ///
    /// # Errors
    ///
    /// Returns an error if the attempt is submitted, the question does not
    /// exist, or the option is not one the question offers.
    pub fn select(&mut self, quiz: &Quiz, index: usize, option: &str) -> Result<(), Error> {
        if self.is_submitted {
            return Err(Error::Submitted);
        }

        let question = quiz.question(index).ok_or(Error::QuestionOutOfRange(index))?;
        if !question.offers(option) {
            return Err(Error::UnknownOption(index));
        }

        self.answers.insert(index, option.to_owned());

        Ok(())
    }

    /// Records a violation and returns the new warning count
    ///
    /// The count saturates at its limit; violations past the limit are
    /// still logged.
    pub(crate) fn record_violation(&mut self, kind: ViolationKind) -> usize {
        self.warning_count = (self.warning_count + 1).min(crate::constants::proctor::MAX_WARNINGS);
        self.tallies[kind] += 1;
        self.violations.push(Violation {
            kind,
            at: SystemTime::now(),
            warning_count: self.warning_count,
        });
        self.warning_count
    }

    /// Arms a new grace timer, invalidating any pending one
    pub(crate) fn arm_grace(&mut self) -> u64 {
        self.grace_tokens += 1;
        self.pending_grace = Some(self.grace_tokens);
        self.grace_tokens
    }

    /// Consumes the pending grace timer if `token` identifies it
    ///
    /// Returns `false` for tokens of timers that were re-armed or cancelled.
    pub(crate) fn take_grace(&mut self, token: u64) -> bool {
        if self.pending_grace == Some(token) {
            self.pending_grace = None;
            true
        } else {
            false
        }
    }

    pub(crate) fn mark_submitted(&mut self) {
        self.is_submitted = true;
        self.pending_grace = None;
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::quiz::{Question, QuizId};

    fn create_test_quiz() -> Quiz {
        Quiz {
            id: QuizId::from("quiz-1"),
            title: "Test".to_string(),
            description: String::new(),
            questions: vec![Question {
                question_text: "2 + 2".to_string(),
                options: vec!["3".to_string(), "4".to_string()],
                correct_answer: "4".to_string(),
            }],
        }
    }

    #[test]
    fn test_select_replaces_previous_answer() {
        let quiz = create_test_quiz();
        let mut attempt = QuizAttempt::new();

        attempt.select(&quiz, 0, "3").unwrap();
        attempt.select(&quiz, 0, "4").unwrap();

        assert_eq!(attempt.answers().len(), 1);
        assert_eq!(attempt.answers()[&0], "4");
    }

    #[test]
    fn test_select_rejects_unknown_question() {
        let quiz = create_test_quiz();
        let mut attempt = QuizAttempt::new();

        assert_eq!(
            attempt.select(&quiz, 3, "4"),
            Err(Error::QuestionOutOfRange(3))
        );
        assert!(attempt.answers().is_empty());
    }

    #[test]
    fn test_select_rejects_unknown_option() {
        let quiz = create_test_quiz();
        let mut attempt = QuizAttempt::new();

        assert_eq!(attempt.select(&quiz, 0, "5"), Err(Error::UnknownOption(0)));
    }

    #[test]
    fn test_select_after_submission() {
        let quiz = create_test_quiz();
        let mut attempt = QuizAttempt::new();
        attempt.mark_submitted();

        assert_eq!(attempt.select(&quiz, 0, "4"), Err(Error::Submitted));
    }

    #[test]
    fn test_warning_count_saturates() {
        let mut attempt = QuizAttempt::new();

        for expected in 1..=crate::constants::proctor::MAX_WARNINGS {
            assert_eq!(attempt.record_violation(ViolationKind::TabHidden), expected);
        }
        assert_eq!(
            attempt.record_violation(ViolationKind::TabHidden),
            crate::constants::proctor::MAX_WARNINGS
        );
        assert!(attempt.warnings_exhausted());
        assert_eq!(attempt.warnings_left(), 0);
        assert_eq!(attempt.violations().len(), 6);
    }

    #[test]
    fn test_violation_tallies() {
        let mut attempt = QuizAttempt::new();

        attempt.record_violation(ViolationKind::TabHidden);
        attempt.record_violation(ViolationKind::FullscreenExit);
        attempt.record_violation(ViolationKind::TabHidden);

        assert_eq!(attempt.violation_count(ViolationKind::TabHidden), 2);
        assert_eq!(attempt.violation_count(ViolationKind::FullscreenExit), 1);
        assert_eq!(attempt.violation_count(ViolationKind::GraceExpired), 0);
        assert_eq!(attempt.violations()[1].warning_count, 2);
    }

    #[test]
    fn test_rearming_grace_invalidates_previous_token() {
        let mut attempt = QuizAttempt::new();

        let first = attempt.arm_grace();
        let second = attempt.arm_grace();

        assert_ne!(first, second);
        assert!(!attempt.take_grace(first));
        assert!(attempt.take_grace(second));
        assert!(!attempt.take_grace(second));
        assert_eq!(attempt.pending_grace(), None);
    }

    #[test]
    fn test_submission_clears_grace() {
        let mut attempt = QuizAttempt::new();
        let token = attempt.arm_grace();

        attempt.mark_submitted();

        assert!(attempt.is_submitted());
        assert!(!attempt.take_grace(token));
    }

    #[test]
    fn test_compliance() {
        let mut attempt = QuizAttempt::new();

        assert!(!attempt.is_compliant(true));
        assert!(attempt.is_compliant(false));

        attempt.set_fullscreen(true);
        assert!(attempt.is_compliant(true));

        attempt.set_hidden(true);
        assert!(!attempt.is_compliant(true));
        assert!(!attempt.is_compliant(false));
    }

    #[test]
    fn test_attempt_id_round_trips_through_string() {
        let id = AttemptId::new();
        let parsed: AttemptId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }
}
