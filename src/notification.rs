//! Transient user notifications (toasts)

use serde::{Deserialize, Serialize};

/// Severity of a notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Level {
    /// Neutral information
    Info,
    /// An operation succeeded
    Success,
    /// The user is being warned about their behaviour
    Warning,
    /// An operation failed
    Error,
}

/// A short-lived notification shown to the user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    /// How the notification should be styled
    pub level: Level,
    /// The text of the notification
    pub message: String,
}

impl Notification {
    fn new(level: Level, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
        }
    }

    /// Creates an informational notification
    pub fn info(message: impl Into<String>) -> Self {
        Self::new(Level::Info, message)
    }

    /// Creates a success notification
    pub fn success(message: impl Into<String>) -> Self {
        Self::new(Level::Success, message)
    }

    /// Creates a warning notification
    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(Level::Warning, message)
    }

    /// Creates an error notification
    pub fn error(message: impl Into<String>) -> Self {
        Self::new(Level::Error, message)
    }
}
