//! Score submission
//!
//! A [`Submission`] is issued by the monitor whenever an attempt is to be
//! submitted, manually or forced. The host hands it to a [`Submitter`] and
//! reports the outcome back to the monitor.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    attempt::AttemptId,
    quiz::{QuizId, UserId},
};

/// Message shown when the server rejects a submission without saying why
pub const GENERIC_REJECTION: &str = "Failed to submit quiz.";

/// Message shown when the submission could not be delivered at all
pub const TRANSPORT_FAILURE: &str = "An error occurred. Please try again.";

/// A pending submission of a scored attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submission {
    /// The attempt being submitted
    pub attempt_id: AttemptId,
    /// Position of this submission among those issued for the attempt
    pub sequence: u64,
    /// The quiz the attempt belongs to
    pub quiz_id: QuizId,
    /// The user who took the quiz
    pub user_id: UserId,
    /// Bearer token to authenticate the request with, if any
    #[serde(skip_serializing)]
    pub token: Option<String>,
    /// The computed score
    pub score: u64,
    /// Whether the submission was forced by exhausted warnings
    pub forced: bool,
}

impl Submission {
    /// Returns the request body sent to the quiz API
    pub fn body(&self) -> SubmitBody<'_> {
        SubmitBody {
            user_id: &self.user_id,
            score: self.score,
        }
    }
}

/// JSON body of a submit request
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitBody<'a> {
    /// The user who took the quiz
    pub user_id: &'a UserId,
    /// The computed score
    pub score: u64,
}

/// Reasons a submission did not succeed
#[derive(Error, Serialize, Debug, Clone, PartialEq, Eq)]
pub enum SubmitError {
    /// The server answered with a non-success status
    #[error("submission rejected with status {status}")]
    Rejected {
        /// HTTP status of the response
        status: u16,
        /// Message carried by the response body, if any
        message: Option<String>,
    },
    /// The request failed or the response could not be read
    #[error("submission failed: {0}")]
    Transport(String),
}

impl SubmitError {
    /// Returns the text presented to the user for this failure
    pub fn user_message(&self) -> &str {
        match self {
            Self::Rejected { message, .. } => message.as_deref().unwrap_or(GENERIC_REJECTION),
            Self::Transport(_) => TRANSPORT_FAILURE,
        }
    }
}

/// Delivers submissions to the quiz API
///
/// Hosts running on a single-threaded event loop can implement this with
/// non-`Send` futures.
#[allow(async_fn_in_trait)]
pub trait Submitter {
    /// Sends `submission` and waits for the outcome
    ///
    /// # Errors
    ///
    /// Returns a [`SubmitError`] if the server rejected the submission or
    /// it could not be delivered.
    async fn submit(&self, submission: &Submission) -> Result<(), SubmitError>;
}
