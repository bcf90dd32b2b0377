// src/services/submission.rs

use std::collections::HashMap;

use chrono::{Duration, Utc};
use sqlx::{SqliteConnection, SqlitePool};

use crate::{
    error::AppError,
    models::attempt::{ExamAttempt, SubmissionResult},
    services::scoring::{self, AnswerKey, Grade},
};

/// A validated submission, ready to be graded.
#[derive(Debug, Clone)]
pub struct Submission {
    pub exam_id: i64,
    pub user_id: i64,
    pub answers: HashMap<i64, String>,
    pub time_spent: i64,
}

/// Grades a submission and stores the attempt with its responses.
///
/// The answer key is read before the transaction opens: the transaction must
/// start with a write so concurrent submissions wait on SQLite's write lock
/// rather than hitting a busy snapshot. Any failure rolls back, so no attempt
/// exists without its responses or the other way round.
pub async fn submit_exam(
    pool: &SqlitePool,
    submission: &Submission,
) -> Result<SubmissionResult, AppError> {
    let grade = load_and_grade(pool, submission).await?;

    let mut tx = pool.begin().await?;

    let outcome = record(&mut *tx, submission, &grade).await;

    match outcome {
        Ok(result) => {
            tx.commit().await?;
            tracing::info!(
                attempt_id = result.attempt_id,
                user_id = submission.user_id,
                exam_id = submission.exam_id,
                score = result.score,
                passed = result.passed,
                "Exam submitted"
            );
            Ok(result)
        }
        Err(err) => {
            if let Err(rollback_err) = tx.rollback().await {
                tracing::error!("Failed to roll back submission: {:?}", rollback_err);
            }
            Err(err)
        }
    }
}

async fn load_and_grade(pool: &SqlitePool, submission: &Submission) -> Result<Grade, AppError> {
    let passing_score: i64 = sqlx::query_scalar("SELECT passing_score FROM exams WHERE id = $1")
        .bind(submission.exam_id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFound("Exam not found".to_string()))?;

    let keys: Vec<AnswerKey> = sqlx::query_as(
        "SELECT id, correct_answer, points FROM questions WHERE exam_id = $1 ORDER BY id",
    )
    .bind(submission.exam_id)
    .fetch_all(pool)
    .await?;

    scoring::grade(&keys, &submission.answers, passing_score)
}

async fn record(
    conn: &mut SqliteConnection,
    submission: &Submission,
    grade: &Grade,
) -> Result<SubmissionResult, AppError> {
    let attempt = insert_attempt(&mut *conn, submission, grade).await?;

    for response in &grade.responses {
        sqlx::query(
            r#"
            INSERT INTO user_question_responses (attempt_id, question_id, user_answer, is_correct)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(attempt.id)
        .bind(response.question_id)
        .bind(&response.user_answer)
        .bind(response.is_correct)
        .execute(&mut *conn)
        .await?;
    }

    Ok(SubmissionResult::from(&attempt))
}

async fn insert_attempt(
    conn: &mut SqliteConnection,
    submission: &Submission,
    grade: &Grade,
) -> Result<ExamAttempt, AppError> {
    let raw_answers = serde_json::to_string(&submission.answers)
        .map_err(|e| AppError::InternalServerError(e.to_string()))?;

    let completed_at = Utc::now().naive_utc();
    let started_at = completed_at - Duration::seconds(submission.time_spent);

    let attempt = sqlx::query_as::<_, ExamAttempt>(
        r#"
        INSERT INTO user_exam_attempts
            (user_id, exam_id, score, total_questions, correct_answers,
             time_spent, passed, answers, started_at, completed_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        RETURNING *
        "#,
    )
    .bind(submission.user_id)
    .bind(submission.exam_id)
    .bind(grade.score)
    .bind(grade.total_questions)
    .bind(grade.correct_answers)
    .bind(submission.time_spent)
    .bind(grade.passed)
    .bind(raw_answers)
    .bind(started_at)
    .bind(completed_at)
    .fetch_one(&mut *conn)
    .await?;

    Ok(attempt)
}

impl From<&ExamAttempt> for SubmissionResult {
    fn from(attempt: &ExamAttempt) -> Self {
        Self {
            attempt_id: attempt.id,
            score: attempt.score,
            correct_answers: attempt.correct_answers,
            total_questions: attempt.total_questions,
            passed: attempt.passed,
            time_spent: attempt.time_spent,
        }
    }
}
