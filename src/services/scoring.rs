// src/services/scoring.rs

use std::collections::HashMap;

use crate::error::AppError;

/// Answer key of one exam question, as fetched for grading.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AnswerKey {
    pub id: i64,
    pub correct_answer: String,
    pub points: Option<i64>,
}

impl AnswerKey {
    /// Unset points count as 1.
    pub fn weight(&self) -> i64 {
        self.points.unwrap_or(1)
    }
}

/// Outcome for a single question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GradedResponse {
    pub question_id: i64,
    /// `None` when the question was left unanswered.
    pub user_answer: Option<String>,
    pub is_correct: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grade {
    pub earned_points: i64,
    pub total_points: i64,
    pub correct_answers: i64,
    pub total_questions: i64,
    /// Percentage 0..=100.
    pub score: i64,
    pub passed: bool,
    /// One entry per key, in key order.
    pub responses: Vec<GradedResponse>,
}

/// Grades submitted answers against an exam's answer keys.
///
/// Every key produces exactly one response. Comparison is exact and
/// case-sensitive. Answers for ids that are not in `keys` are ignored.
/// An exam worth zero points cannot be scored and is rejected.
pub fn grade(
    keys: &[AnswerKey],
    answers: &HashMap<i64, String>,
    passing_score: i64,
) -> Result<Grade, AppError> {
    let mut earned_points = 0;
    let mut total_points = 0;
    let mut correct_answers = 0;
    let mut responses = Vec::with_capacity(keys.len());

    for key in keys {
        let weight = key.weight();
        total_points += weight;

        let user_answer = answers.get(&key.id).cloned();
        let is_correct = user_answer.as_deref() == Some(key.correct_answer.as_str());

        if is_correct {
            earned_points += weight;
            correct_answers += 1;
        }

        responses.push(GradedResponse {
            question_id: key.id,
            user_answer,
            is_correct,
        });
    }

    if total_points <= 0 {
        return Err(AppError::BadRequest(
            "Exam has no gradable questions".to_string(),
        ));
    }

    let score = round_percent(earned_points, total_points);

    Ok(Grade {
        earned_points,
        total_points,
        correct_answers,
        total_questions: keys.len() as i64,
        score,
        passed: score >= passing_score,
        responses,
    })
}

/// `round(100 * part / whole)` with halves rounded up, in integer math.
/// Returns 0 when `whole` is not positive.
pub fn round_percent(part: i64, whole: i64) -> i64 {
    if whole <= 0 {
        return 0;
    }
    (200 * part + whole) / (2 * whole)
}
