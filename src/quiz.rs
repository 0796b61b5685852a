//! Quiz definitions
//!
//! This module defines the read-only quiz structure handed to a proctored
//! attempt, as it is delivered by the quiz API, together with the scoring
//! rules applied to a set of selected answers.

use garde::Validate;
use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::attempt::Answers;

/// Identifier of a quiz as assigned by the quiz API
///
/// Identifiers are opaque: they are only ever compared and interpolated
/// into request paths.
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    derive_more::Display,
    derive_more::From,
)]
#[serde(transparent)]
pub struct QuizId(String);

impl QuizId {
    /// Returns the identifier as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for QuizId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

/// Identifier of the user taking the quiz
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    derive_more::Display,
    derive_more::From,
)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    /// Returns the identifier as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for UserId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

/// A single multiple choice question
///
/// Options are plain text. The correct answer is recorded as the text of
/// the correct option and compared verbatim when scoring.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    /// The question prompt shown to the user
    #[garde(length(max = crate::constants::quiz::MAX_QUESTION_LENGTH))]
    pub question_text: String,
    /// The options the user chooses from
    #[garde(length(min = crate::constants::quiz::MIN_OPTION_COUNT, max = crate::constants::quiz::MAX_OPTION_COUNT))]
    pub options: Vec<String>,
    /// Text of the correct option
    #[garde(skip)]
    pub correct_answer: String,
}

impl Question {
    /// Checks whether `option` is one of the options offered by this question
    pub fn offers(&self, option: &str) -> bool {
        self.options.iter().any(|o| o == option)
    }

    /// Checks whether `selected` is the correct answer to this question
    ///
    /// The comparison is an exact string comparison.
    pub fn is_correct(&self, selected: &str) -> bool {
        self.correct_answer == selected
    }
}

/// A complete quiz as delivered by the quiz API
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Quiz {
    /// API identifier of the quiz
    #[serde(rename = "_id")]
    #[garde(skip)]
    pub id: QuizId,
    /// The title of the quiz
    #[garde(length(max = crate::constants::quiz::MAX_TITLE_LENGTH))]
    pub title: String,
    /// Free-form description shown under the title
    #[serde(default)]
    #[garde(length(max = crate::constants::quiz::MAX_DESCRIPTION_LENGTH))]
    pub description: String,
    /// The questions of the quiz, in display order
    #[garde(length(max = crate::constants::quiz::MAX_QUESTION_COUNT), dive)]
    pub questions: Vec<Question>,
}

impl Quiz {
    /// Returns the number of questions in this quiz
    pub fn len(&self) -> usize {
        self.questions.len()
    }

    /// Checks if this quiz contains any questions
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    /// Returns the question at `index`, if any
    pub fn question(&self, index: usize) -> Option<&Question> {
        self.questions.get(index)
    }

    /// Computes the score for a set of selected answers
    ///
    /// Every question whose selected option exactly matches its correct
    /// answer is worth a fixed number of points. Unanswered questions and
    /// wrong answers are worth nothing.
    pub fn score(&self, answers: &Answers) -> u64 {
        self.questions
            .iter()
            .enumerate()
            .filter(|(index, question)| {
                answers
                    .get(index)
                    .is_some_and(|selected| question.is_correct(selected))
            })
            .count() as u64
            * crate::constants::scoring::POINTS_PER_CORRECT_ANSWER
    }

    /// Returns the indices of questions that have no selected answer
    pub fn unanswered(&self, answers: &Answers) -> Vec<usize> {
        (0..self.questions.len())
            .filter(|index| !answers.contains_key(index))
            .collect_vec()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    fn question(text: &str, options: &[&str], correct: &str) -> Question {
        Question {
            question_text: text.to_string(),
            options: options.iter().map(|o| (*o).to_string()).collect(),
            correct_answer: correct.to_string(),
        }
    }

    fn create_test_quiz() -> Quiz {
        Quiz {
            id: QuizId::from("quiz-1"),
            title: "Rust Basics".to_string(),
            description: "Ownership and borrowing".to_string(),
            questions: vec![
                question("Who owns a moved value?", &["caller", "callee"], "callee"),
                question("Is &mut aliasable?", &["yes", "no"], "no"),
            ],
        }
    }

    fn answers(pairs: &[(usize, &str)]) -> Answers {
        pairs
            .iter()
            .map(|(index, option)| (*index, (*option).to_string()))
            .collect()
    }

    #[test]
    fn test_deserialize_from_api_shape() {
        let json = r#"{
            "_id": "65f0c0ffee",
            "title": "Rust Basics",
            "description": "Ownership",
            "questions": [
                {
                    "questionText": "Is &mut aliasable?",
                    "options": ["yes", "no"],
                    "correctAnswer": "no"
                }
            ]
        }"#;

        let quiz: Quiz = serde_json::from_str(json).unwrap();

        assert_eq!(quiz.id.as_str(), "65f0c0ffee");
        assert_eq!(quiz.len(), 1);
        assert_eq!(quiz.questions[0].correct_answer, "no");
        assert!(quiz.validate().is_ok());
    }

    #[test]
    fn test_deserialize_without_description() {
        let json = r#"{"_id": "q", "title": "T", "questions": []}"#;
        let quiz: Quiz = serde_json::from_str(json).unwrap();

        assert!(quiz.description.is_empty());
        assert!(quiz.is_empty());
    }

    #[test]
    fn test_score_all_correct() {
        let quiz = create_test_quiz();
        assert_eq!(quiz.score(&answers(&[(0, "callee"), (1, "no")])), 20);
    }

    #[test]
    fn test_score_one_correct() {
        let quiz = create_test_quiz();
        assert_eq!(quiz.score(&answers(&[(0, "caller"), (1, "no")])), 10);
    }

    #[test]
    fn test_score_none_correct() {
        let quiz = create_test_quiz();
        assert_eq!(quiz.score(&answers(&[(0, "caller"), (1, "yes")])), 0);
    }

    #[test]
    fn test_score_is_case_sensitive() {
        let quiz = create_test_quiz();
        assert_eq!(quiz.score(&answers(&[(0, "Callee"), (1, "NO")])), 0);
    }

    #[test]
    fn test_score_empty_answers() {
        let quiz = create_test_quiz();
        assert_eq!(quiz.score(&Answers::new()), 0);
    }

    #[test]
    fn test_score_ignores_out_of_range_indices() {
        let quiz = create_test_quiz();
        assert_eq!(quiz.score(&answers(&[(7, "no")])), 0);
    }

    #[test]
    fn test_unanswered() {
        let quiz = create_test_quiz();

        assert_eq!(quiz.unanswered(&Answers::new()), vec![0, 1]);
        assert_eq!(quiz.unanswered(&answers(&[(1, "no")])), vec![0]);
        assert!(quiz.unanswered(&answers(&[(0, "caller"), (1, "no")])).is_empty());
    }

    #[test]
    fn test_question_offers() {
        let quiz = create_test_quiz();
        let question = quiz.question(1).unwrap();

        assert!(question.offers("yes"));
        assert!(!question.offers("maybe"));
    }

    #[test]
    fn test_validation_title_too_long() {
        let mut quiz = create_test_quiz();
        quiz.title = "a".repeat(crate::constants::quiz::MAX_TITLE_LENGTH + 1);
        assert!(quiz.validate().is_err());
    }

    #[test]
    fn test_validation_question_without_options() {
        let mut quiz = create_test_quiz();
        quiz.questions[0].options.clear();
        assert!(quiz.validate().is_err());
    }

    #[test]
    fn test_validation_too_many_options() {
        let mut quiz = create_test_quiz();
        quiz.questions[0].options = (0..=crate::constants::quiz::MAX_OPTION_COUNT)
            .map(|i| i.to_string())
            .collect();
        assert!(quiz.validate().is_err());
    }
}
