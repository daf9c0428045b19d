// src/services/grading.rs

//! Quiz grading.
//!
//! Scoring is a single pass over the quiz's questions. It never fails on learner
//! input: missing or malformed answers simply count as wrong.

use serde_json::Value;

use crate::{
    db::QuizStore,
    error::AppError,
    models::{
        question::{Question, Quiz},
        quiz_attempt::{NewQuizAttempt, QuizAttempt, SubmittedAnswers},
    },
};

/// Result of grading one submission against an answer key.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Grade {
    pub correct_count: usize,
    pub total_questions: usize,
    /// Percentage in 0..=100. Zero for a quiz without questions.
    pub score: f64,
}

/// Interprets a submitted value as an option index.
///
/// Accepts JSON integers, integral floats and numeric strings; everything else is `None`.
fn selected_index(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && f.is_finite())
                .map(|f| f as i64)
        }),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

/// Grades `answers` against `questions`. Read-only with respect to the quiz.
pub fn score_attempt(questions: &[Question], answers: &SubmittedAnswers) -> Grade {
    let total_questions = questions.len();
    if total_questions == 0 {
        return Grade {
            correct_count: 0,
            total_questions: 0,
            score: 0.0,
        };
    }

    let correct_count = questions
        .iter()
        .filter(|q| {
            answers
                .get(&q.id.to_string())
                .and_then(selected_index)
                .is_some_and(|idx| idx == i64::from(q.correct_answer))
        })
        .count();

    let score = (correct_count as f64 / total_questions as f64) * 100.0;
    Grade {
        correct_count,
        total_questions,
        score,
    }
}

/// Grades a submission and persists it as a new, immutable attempt.
///
/// Returns `NotFound` if the quiz does not exist. Each call inserts a fresh row.
pub async fn submit_attempt<S>(
    store: &S,
    user_id: i64,
    quiz_id: i64,
    answers: SubmittedAnswers,
) -> Result<(Quiz, QuizAttempt, Grade), AppError>
where
    S: QuizStore + ?Sized,
{
    let quiz = store
        .get_quiz(quiz_id)
        .await?
        .ok_or(AppError::NotFound("Quiz not found".to_string()))?;

    let questions = store.questions_for_quiz(quiz.id).await?;
    let grade = score_attempt(&questions, &answers);

    let attempt = store
        .insert_attempt(NewQuizAttempt {
            user_id,
            quiz_id: quiz.id,
            answers,
            score: grade.score,
        })
        .await?;

    tracing::info!(
        "User {} scored {:.1}% on quiz {} ({}/{})",
        user_id,
        grade.score,
        quiz.id,
        grade.correct_count,
        grade.total_questions
    );

    Ok((quiz, attempt, grade))
}
