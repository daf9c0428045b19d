// src/models/question.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{prelude::FromRow, types::Json};
use validator::Validate;

/// Represents the 'quizzes' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Quiz {
    pub id: i64,
    pub course_id: i64,
    pub title: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

/// Represents the 'questions' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Question {
    pub id: i64,
    pub quiz_id: i64,

    /// The prompt shown to the learner.
    pub text: String,

    /// Ordered list of options (e.g., ["Option A", "Option B"]).
    /// Stored as a JSON array in the database.
    pub options: Json<Vec<String>>,

    /// Index into `options` of the correct choice.
    pub correct_answer: i32,

    /// Display order within the quiz.
    pub position: i32,
}

/// DTO for sending a question to the learner (excludes the answer key).
#[derive(Debug, Serialize, Deserialize)]
pub struct PublicQuestion {
    pub id: i64,
    pub text: String,
    pub options: Vec<String>,
}

impl From<Question> for PublicQuestion {
    fn from(q: Question) -> Self {
        Self {
            id: q.id,
            text: q.text,
            options: q.options.0,
        }
    }
}

/// A quiz as delivered to learners.
#[derive(Debug, Serialize)]
pub struct QuizDetail {
    pub id: i64,
    pub course_id: i64,
    pub title: String,
    pub description: String,
    pub questions: Vec<PublicQuestion>,
}

/// DTO for creating a quiz together with its questions.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateQuizRequest {
    pub course_id: i64,
    #[validate(length(min = 1, max = 255))]
    pub title: String,
    #[validate(length(max = 5000))]
    #[serde(default)]
    pub description: String,
    #[validate(length(min = 1, max = 200), nested)]
    pub questions: Vec<CreateQuestionRequest>,
}

/// DTO for a single question inside [`CreateQuizRequest`].
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct CreateQuestionRequest {
    #[validate(length(min = 1, max = 1000))]
    pub text: String,
    #[validate(custom(function = validate_options))]
    pub options: Vec<String>,
    #[validate(range(min = 0))]
    pub correct_answer: i32,
}

impl CreateQuestionRequest {
    /// The answer key must point at one of the options.
    pub fn answer_in_range(&self) -> bool {
        usize::try_from(self.correct_answer).is_ok_and(|idx| idx < self.options.len())
    }
}

fn validate_options(options: &[String]) -> Result<(), validator::ValidationError> {
    if options.len() < 2 {
        return Err(validator::ValidationError::new("at_least_two_options"));
    }
    for opt in options {
        if opt.is_empty() || opt.len() > 500 {
            return Err(validator::ValidationError::new("invalid_option_length"));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question(options: &[&str], correct_answer: i32) -> CreateQuestionRequest {
        CreateQuestionRequest {
            text: "Which keyword declares an immutable binding?".to_string(),
            options: options.iter().map(|o| o.to_string()).collect(),
            correct_answer,
        }
    }

    #[test]
    fn answer_key_must_be_in_range() {
        assert!(question(&["let", "var"], 0).answer_in_range());
        assert!(question(&["let", "var"], 1).answer_in_range());
        assert!(!question(&["let", "var"], 2).answer_in_range());
        assert!(!question(&["let", "var"], -1).answer_in_range());
    }

    #[test]
    fn single_option_question_is_invalid() {
        assert!(question(&["let"], 0).validate().is_err());
    }

    #[test]
    fn nested_questions_are_validated() {
        let req = CreateQuizRequest {
            course_id: 1,
            title: "Bindings".to_string(),
            description: String::new(),
            questions: vec![question(&["let", ""], 0)],
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn question_count_is_bounded() {
        let mut req = CreateQuizRequest {
            course_id: 1,
            title: "Bindings".to_string(),
            description: String::new(),
            questions: Vec::new(),
        };
        assert!(req.validate().is_err());

        req.questions = (0..3).map(|_| question(&["let", "var"], 0)).collect();
        assert!(req.validate().is_ok());

        req.questions = (0..201).map(|_| question(&["let", "var"], 0)).collect();
        let errors = req.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("questions"));
    }

    #[test]
    fn public_question_hides_answer_key() {
        let q = Question {
            id: 7,
            quiz_id: 1,
            text: "2 + 2?".to_string(),
            options: Json(vec!["3".to_string(), "4".to_string()]),
            correct_answer: 1,
            position: 0,
        };
        let public = serde_json::to_value(PublicQuestion::from(q)).unwrap();
        assert!(public.get("correct_answer").is_none());
        assert_eq!(public["options"][1], "4");
    }
}
