//! HTTP client for the quiz API
//!
//! [`QuizClient`] is the [`Submitter`] used in production. It posts the
//! score of an attempt to the quiz API and maps the response onto a
//! [`SubmitError`].

use reqwest::{Client, Url};
use serde::Deserialize;
use tracing::{error, info, warn};

use crate::{
    config::{API_URL_VAR, ClientConfig},
    error::{Error, Result},
    quiz::QuizId,
    submission::{SubmitError, Submission, Submitter},
};

/// Body returned by the submit endpoint
#[derive(Debug, Deserialize)]
struct SubmitResponse {
    message: Option<String>,
}

/// Client for the quiz API
#[derive(Debug, Clone)]
pub struct QuizClient {
    client: Client,
    base_url: Url,
}

impl QuizClient {
    /// Builds a client from `config`
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL cannot be used as a base for
    /// request paths, or the underlying HTTP client cannot be built.
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let base_url = Url::parse(&config.api_base_url)
            .map_err(|e| Error::Config(format!("Invalid value for {API_URL_VAR}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(Error::Config(format!(
                "Invalid value for {API_URL_VAR}: {base_url} cannot be a base URL"
            )));
        }

        let client = Client::builder().timeout(config.request_timeout).build()?;

        Ok(Self { client, base_url })
    }

    /// Builds a client configured from the environment
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is incomplete or the HTTP
    /// client cannot be built.
    pub fn from_env() -> Result<Self> {
        Self::new(&ClientConfig::from_env()?)
    }

    /// Returns the URL submissions for `quiz_id` are posted to
    ///
    /// The quiz id is percent-encoded as a single path segment.
    pub fn submit_url(&self, quiz_id: &QuizId) -> Url {
        let mut url = self.base_url.clone();
        // base URLs are checked in `new`
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .extend(["api", "quizzes", quiz_id.as_str(), "submit"]);
        }
        url
    }
}

impl Submitter for QuizClient {
    async fn submit(&self, submission: &Submission) -> std::result::Result<(), SubmitError> {
        let mut request = self
            .client
            .post(self.submit_url(&submission.quiz_id))
            .json(&submission.body());
        if let Some(token) = &submission.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| {
            error!(attempt = %submission.attempt_id, "failed to send submission: {e}");
            SubmitError::Transport(e.to_string())
        })?;

        let status = response.status();
        let body: SubmitResponse = response.json().await.map_err(|e| {
            error!(attempt = %submission.attempt_id, %status, "unreadable submit response: {e}");
            SubmitError::Transport(e.to_string())
        })?;

        if status.is_success() {
            info!(attempt = %submission.attempt_id, score = submission.score, "submission accepted");
            Ok(())
        } else {
            warn!(attempt = %submission.attempt_id, %status, "submission rejected");
            Err(SubmitError::Rejected {
                status: status.as_u16(),
                message: body.message,
            })
        }
    }
}
