// src/handlers/exam.rs

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::SqlitePool;
use validator::Validate;

use crate::{
    error::{AppError, AppJson},
    models::{
        attempt::{AttemptResults, AttemptSummary, ResponseReview, ResultsQuery, SubmitExamRequest},
        exam::{CreateExamRequest, Exam, ExamDetail},
        question::PublicQuestion,
    },
    services::submission::{self, Submission},
    utils::{
        html::{clean_html, clean_optional},
        jwt::{Claims, is_admin},
    },
};

/// Upper bound on a reported exam duration, in seconds.
const MAX_TIME_SPENT: i64 = 24 * 60 * 60;

/// Upper bound on answers accepted in one submission.
const MAX_ANSWERS: usize = 1000;

const EXAM_SELECT: &str = r#"
    SELECT
        e.id, e.title, e.description, e.duration, e.total_questions,
        e.passing_score, e.subject, e.difficulty, e.created_by,
        u.name AS creator_name,
        e.is_active, e.created_at, e.updated_at
    FROM exams e
    LEFT JOIN users u ON e.created_by = u.id
"#;

async fn fetch_exam(pool: &SqlitePool, id: i64) -> Result<Option<Exam>, AppError> {
    let exam = sqlx::query_as::<_, Exam>(&format!("{} WHERE e.id = $1", EXAM_SELECT))
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(exam)
}

/// Lists active exams, newest first.
pub async fn list_exams(State(pool): State<SqlitePool>) -> Result<impl IntoResponse, AppError> {
    let exams = sqlx::query_as::<_, Exam>(&format!(
        "{} WHERE e.is_active = 1 ORDER BY e.created_at DESC, e.id DESC",
        EXAM_SELECT
    ))
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to fetch exams: {:?}", e);
        AppError::from(e)
    })?;

    Ok(Json(exams))
}

/// Returns an exam with its questions. Answer keys and explanations are
/// never selected, so they cannot leak to the exam taker.
pub async fn get_exam(
    State(pool): State<SqlitePool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let exam = fetch_exam(&pool, id)
        .await?
        .ok_or(AppError::NotFound("Exam not found".to_string()))?;

    let questions = sqlx::query_as::<_, PublicQuestion>(
        r#"
        SELECT id, subject, topic, difficulty, question_text, options, points
        FROM questions
        WHERE exam_id = $1
        ORDER BY id
        "#,
    )
    .bind(id)
    .fetch_all(&pool)
    .await?;

    Ok(Json(ExamDetail { exam, questions }))
}

/// Creates an exam owned by the calling admin.
pub async fn create_exam(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    AppJson(payload): AppJson<CreateExamRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let created_by = claims.user_id()?;

    let id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO exams
        (title, description, duration, total_questions, passing_score, subject, difficulty, created_by)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING id
        "#,
    )
    .bind(clean_html(&payload.title))
    .bind(clean_optional(payload.description))
    .bind(payload.duration)
    .bind(payload.total_questions)
    .bind(payload.passing_score)
    .bind(payload.subject)
    .bind(payload.difficulty)
    .bind(created_by)
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to create exam: {:?}", e);
        AppError::from(e)
    })?;

    let exam = fetch_exam(&pool, id)
        .await?
        .ok_or(AppError::InternalServerError("Created exam vanished".to_string()))?;

    Ok((StatusCode::CREATED, Json(exam)))
}

/// Soft-deletes an exam. Its questions and attempts are kept.
pub async fn delete_exam(
    State(pool): State<SqlitePool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let result = sqlx::query(
        "UPDATE exams SET is_active = 0, updated_at = CURRENT_TIMESTAMP WHERE id = $1",
    )
    .bind(id)
    .execute(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to delete exam: {:?}", e);
        AppError::from(e)
    })?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Exam not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}

/// Grades and records an exam submission for the authenticated user.
///
/// The user comes from the token. A `user_id` in the body is tolerated
/// only when it names the same user.
pub async fn submit_exam(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(exam_id): Path<i64>,
    AppJson(req): AppJson<SubmitExamRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;

    if req.user_id.is_some_and(|claimed| claimed != user_id) {
        return Err(AppError::Forbidden(
            "Cannot submit on behalf of another user".to_string(),
        ));
    }

    let answers = req
        .answers
        .ok_or(AppError::BadRequest("Answers are required".to_string()))?;

    if answers.len() > MAX_ANSWERS {
        return Err(AppError::BadRequest("Too many answers submitted".to_string()));
    }

    let time_spent = req.time_spent.unwrap_or(0);
    if !(0..=MAX_TIME_SPENT).contains(&time_spent) {
        return Err(AppError::BadRequest(format!(
            "time_spent must be between 0 and {} seconds",
            MAX_TIME_SPENT
        )));
    }

    let submission = Submission {
        exam_id,
        user_id,
        answers,
        time_spent,
    };

    let result = submission::submit_exam(&pool, &submission).await?;

    Ok((StatusCode::CREATED, Json(result)))
}

/// Returns the stored result of an attempt, with a per-question review.
pub async fn get_results(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(exam_id): Path<i64>,
    Query(params): Query<ResultsQuery>,
) -> Result<impl IntoResponse, AppError> {
    let attempt_id = params
        .attempt_id
        .ok_or(AppError::BadRequest("Attempt ID is required".to_string()))?;

    let summary = sqlx::query_as::<_, AttemptSummary>(
        r#"
        SELECT
            a.user_id, a.id AS attempt_id, a.score, a.correct_answers,
            a.total_questions, a.time_spent, a.passed,
            e.passing_score, e.title AS exam_title, e.subject, a.completed_at
        FROM user_exam_attempts a
        JOIN exams e ON a.exam_id = e.id
        WHERE a.id = $1 AND a.exam_id = $2
        "#,
    )
    .bind(attempt_id)
    .bind(exam_id)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound("Results not found".to_string()))?;

    let caller = claims.user_id()?;
    if summary.user_id != caller && !is_admin(&pool, caller).await? {
        return Err(AppError::Forbidden(
            "This attempt belongs to another user".to_string(),
        ));
    }

    let responses = sqlx::query_as::<_, ResponseReview>(
        r#"
        SELECT
            r.question_id, q.question_text, r.user_answer, r.is_correct,
            q.correct_answer, q.explanation
        FROM user_question_responses r
        LEFT JOIN questions q ON r.question_id = q.id
        WHERE r.attempt_id = $1
        ORDER BY r.id
        "#,
    )
    .bind(attempt_id)
    .fetch_all(&pool)
    .await?;

    Ok(Json(AttemptResults { summary, responses }))
}
