//! Collaborators of a proctored attempt
//!
//! This module defines the traits through which the proctoring core talks
//! to the outside world: the [`Surface`] that renders user-facing output
//! and the [`Environment`] that exposes the browser capabilities being
//! monitored. It also defines the explicit [`SessionContext`] identifying
//! who is taking the quiz.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{SyncMessage, UpdateMessage, quiz::UserId};

/// Trait for presenting output to the user taking the quiz
///
/// Implementations render notifications, the warning modal and the result
/// banner. A front end would typically forward these to its UI layer.
pub trait Surface {
    /// Sends an incremental update to the user's view
    ///
    /// # Arguments
    ///
    /// * `message` - The update message to present
    fn send_message(&self, message: &UpdateMessage);

    /// Sends a full snapshot of the view, replacing whatever is shown
    ///
    /// # Arguments
    ///
    /// * `state` - The synchronization message to present
    fn send_state(&self, state: &SyncMessage);
}

/// Errors reported by the environment
#[derive(Error, Serialize, Debug, Clone, PartialEq, Eq)]
pub enum EnvironmentError {
    /// The capability does not exist in this environment
    #[error("capability is not supported")]
    Unsupported,
    /// The environment or the user refused the request
    #[error("request was rejected: {0}")]
    Rejected(String),
}

/// Events delivered by the environment while listeners are attached
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EnvironmentEvent {
    /// Full-screen mode was entered (`active`) or left
    FullscreenChanged {
        /// Whether the page is now in full-screen mode
        active: bool,
    },
    /// The page became hidden or visible again
    VisibilityChanged {
        /// Whether the page is now hidden
        hidden: bool,
    },
}

/// The browser capabilities consumed by the proctoring core
///
/// The core owns listener registration for as long as an attempt is
/// active: listeners are attached when the attempt starts and detached on
/// successful submission, after which no events should be delivered.
pub trait Environment {
    /// Returns whether full-screen mode can be requested at all
    fn fullscreen_supported(&self) -> bool;

    /// Requests full-screen mode for the quiz
    ///
    /// # Errors
    ///
    /// Returns an error if the capability is missing or the request was
    /// rejected.
    fn request_fullscreen(&mut self) -> Result<(), EnvironmentError>;

    /// Returns whether speech synthesis is available
    fn speech_available(&self) -> bool;

    /// Speaks `message` aloud
    ///
    /// # Errors
    ///
    /// Returns an error if the utterance could not be queued.
    fn speak(&mut self, message: &str) -> Result<(), EnvironmentError>;

    /// Starts delivering full-screen and visibility change events
    fn attach_listeners(&mut self);

    /// Stops delivering full-screen and visibility change events
    fn detach_listeners(&mut self);
}

/// Identifies the authenticated user taking a quiz
///
/// The context is passed explicitly into the monitor instead of being read
/// from ambient storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionContext {
    /// The user taking the quiz
    pub user_id: UserId,
    /// Bearer token for the quiz API, if the session has one
    pub token: Option<String>,
}

impl SessionContext {
    /// Creates a context for `user_id` without a bearer token
    pub fn new(user_id: impl Into<UserId>) -> Self {
        Self {
            user_id: user_id.into(),
            token: None,
        }
    }

    /// Attaches a bearer token to the context
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }
}
