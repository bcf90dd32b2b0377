// src/models/attempt.rs

use std::collections::HashMap;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// DTO for submitting an exam.
///
/// Fields are optional at the serde level so a missing field becomes a
/// 400 with a readable message instead of an extractor rejection.
#[derive(Debug, Deserialize)]
pub struct SubmitExamRequest {
    /// Must match the authenticated user when present.
    pub user_id: Option<i64>,

    /// Key: question ID, value: chosen letter.
    /// May be empty; unanswered questions grade as incorrect.
    pub answers: Option<HashMap<i64, String>>,

    /// Elapsed seconds.
    pub time_spent: Option<i64>,
}

/// Returned by a successful submission.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SubmissionResult {
    pub attempt_id: i64,
    pub score: i64,
    pub correct_answers: i64,
    pub total_questions: i64,
    pub passed: bool,
    pub time_spent: i64,
}

/// Represents the 'user_exam_attempts' table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ExamAttempt {
    pub id: i64,
    pub user_id: i64,
    pub exam_id: i64,
    pub score: i64,
    pub total_questions: i64,
    pub correct_answers: i64,
    pub time_spent: i64,
    pub passed: bool,
    /// Raw answers blob as submitted, kept for audit.
    pub answers: String,
    pub started_at: NaiveDateTime,
    pub completed_at: NaiveDateTime,
}

/// Query parameters for the results endpoint.
#[derive(Debug, Deserialize)]
pub struct ResultsQuery {
    pub attempt_id: Option<i64>,
}

/// Attempt summary joined with its exam, as shown on the results page.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct AttemptSummary {
    #[serde(skip)]
    pub user_id: i64,
    pub attempt_id: i64,
    pub score: i64,
    pub correct_answers: i64,
    pub total_questions: i64,
    pub time_spent: i64,
    pub passed: bool,
    pub passing_score: i64,
    pub exam_title: String,
    pub subject: Option<String>,
    pub completed_at: NaiveDateTime,
}

/// One graded question of a finished attempt.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ResponseReview {
    /// `None` if the question was deleted after the attempt.
    pub question_id: Option<i64>,
    pub question_text: Option<String>,
    pub user_answer: Option<String>,
    pub is_correct: bool,
    pub correct_answer: Option<String>,
    pub explanation: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AttemptResults {
    #[serde(flatten)]
    pub summary: AttemptSummary,
    pub responses: Vec<ResponseReview>,
}

/// Row of a user's attempt history.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct UserAttempt {
    pub id: i64,
    pub exam_id: i64,
    pub score: i64,
    pub total_questions: i64,
    pub correct_answers: i64,
    pub time_spent: i64,
    pub passed: bool,
    pub started_at: NaiveDateTime,
    pub completed_at: NaiveDateTime,
    pub exam_title: String,
    pub exam_description: Option<String>,
    pub passing_score: i64,
}
