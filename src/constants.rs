//! Configuration constants for the proctoring system
//!
//! This module contains the fixed proctoring windows and the limits used
//! to validate quiz definitions received from the API. None of these are
//! runtime configurable.

/// Proctoring windows and thresholds
pub mod proctor {
    use web_time::Duration;

    /// Number of warnings after which the attempt is submitted automatically
    pub const MAX_WARNINGS: usize = 5;
    /// Time the user has to return to a compliant state after a violation
    pub const GRACE_PERIOD: Duration = Duration::from_secs(10);
    /// Time after which an open warning modal closes on its own
    pub const MODAL_DISMISS: Duration = Duration::from_secs(5);
}

/// Scoring constants
pub mod scoring {
    /// Points awarded for each correctly answered question
    pub const POINTS_PER_CORRECT_ANSWER: u64 = 10;
}

/// Quiz definition limits
pub mod quiz {
    /// Maximum length of a quiz title in characters
    pub const MAX_TITLE_LENGTH: usize = 200;
    /// Maximum length of a quiz description in characters
    pub const MAX_DESCRIPTION_LENGTH: usize = 2000;
    /// Maximum number of questions in a single quiz
    pub const MAX_QUESTION_COUNT: usize = 100;
    /// Maximum length of a question text in characters
    pub const MAX_QUESTION_LENGTH: usize = 500;
    /// Minimum number of options offered by a question
    pub const MIN_OPTION_COUNT: usize = 1;
    /// Maximum number of options offered by a question
    pub const MAX_OPTION_COUNT: usize = 10;
}
