// src/handlers/question.rs
//
// Question bank management. Every handler here sits behind the admin
// middleware, so full rows (answer keys included) may be returned.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::{QueryBuilder, Sqlite, SqlitePool, types::Json as SqlJson};
use validator::Validate;

use crate::{
    error::{AppError, AppJson},
    models::question::{
        CreateQuestionRequest, Question, QuestionFilter, UpdateQuestionRequest,
        normalize_difficulty,
    },
    utils::html::{clean_html, clean_optional},
};

const QUESTION_COLUMNS: &str = "id, exam_id, subject, topic, difficulty, question_text, options, correct_answer, explanation, points, created_at";

async fn ensure_question_exists(pool: &SqlitePool, id: i64) -> Result<(), AppError> {
    sqlx::query_scalar::<_, i64>("SELECT id FROM questions WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .map(|_| ())
        .ok_or(AppError::NotFound("Question not found".to_string()))
}

/// Escapes `LIKE` wildcards so user input matches literally under `ESCAPE '\'`.
fn escape_like(input: &str) -> String {
    input
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

async fn ensure_exam_exists(pool: &SqlitePool, exam_id: i64) -> Result<(), AppError> {
    sqlx::query_scalar::<_, i64>("SELECT id FROM exams WHERE id = $1")
        .bind(exam_id)
        .fetch_optional(pool)
        .await?
        .map(|_| ())
        .ok_or(AppError::NotFound("Exam not found".to_string()))
}

/// Lists questions, newest first, optionally filtered.
/// `topic` is a substring match; `subject` and `difficulty` are exact.
pub async fn list_questions(
    State(pool): State<SqlitePool>,
    Query(filter): Query<QuestionFilter>,
) -> Result<impl IntoResponse, AppError> {
    let mut builder: QueryBuilder<Sqlite> =
        QueryBuilder::new(format!("SELECT {} FROM questions WHERE 1=1", QUESTION_COLUMNS));

    if let Some(subject) = filter.subject {
        builder.push(" AND subject = ");
        builder.push_bind(subject);
    }

    if let Some(topic) = filter.topic {
        builder.push(" AND topic LIKE ");
        builder.push_bind(format!("%{}%", escape_like(&topic)));
        builder.push(" ESCAPE '\\'");
    }

    if let Some(difficulty) = filter.difficulty {
        builder.push(" AND difficulty = ");
        builder.push_bind(difficulty.to_lowercase());
    }

    builder.push(" ORDER BY created_at DESC, id DESC");

    let questions: Vec<Question> = builder
        .build_query_as()
        .fetch_all(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list questions: {:?}", e);
            AppError::from(e)
        })?;

    Ok(Json(questions))
}

/// Creates a new question, standalone or attached to an exam.
pub async fn create_question(
    State(pool): State<SqlitePool>,
    AppJson(payload): AppJson<CreateQuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let correct_answer = payload.correct_letter()?;
    let difficulty = normalize_difficulty(payload.difficulty.as_deref())?;

    if let Some(exam_id) = payload.exam_id {
        ensure_exam_exists(&pool, exam_id).await?;
    }

    let question_text = clean_html(&payload.question_text);
    if question_text.trim().is_empty() {
        return Err(AppError::BadRequest(
            "Question text cannot be empty".to_string(),
        ));
    }

    let options: Vec<String> = payload.choices.iter().map(|c| clean_html(c)).collect();
    if options.iter().any(|o| o.trim().is_empty()) {
        return Err(AppError::BadRequest("Choices cannot be empty".to_string()));
    }

    let question = sqlx::query_as::<_, Question>(&format!(
        r#"
        INSERT INTO questions
        (exam_id, subject, topic, difficulty, question_text, options, correct_answer, explanation, points)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        RETURNING {}
        "#,
        QUESTION_COLUMNS
    ))
    .bind(payload.exam_id)
    .bind(payload.resolved_subject())
    .bind(payload.resolved_topic())
    .bind(difficulty)
    .bind(question_text)
    .bind(SqlJson(options))
    .bind(correct_answer)
    .bind(clean_optional(payload.explanation))
    .bind(payload.points.unwrap_or(1))
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to create question: {:?}", e);
        AppError::from(e)
    })?;

    Ok((StatusCode::CREATED, Json(question)))
}

/// Updates a question by ID. Setting `exam_id` attaches a standalone
/// question to an exam.
pub async fn update_question(
    State(pool): State<SqlitePool>,
    Path(id): Path<i64>,
    AppJson(payload): AppJson<UpdateQuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    if payload.is_empty() {
        ensure_question_exists(&pool, id).await?;
        return Ok(StatusCode::OK);
    }

    if let Some(exam_id) = payload.exam_id {
        ensure_exam_exists(&pool, exam_id).await?;
    }

    let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE questions SET ");
    let mut separated = builder.separated(", ");

    if let Some(exam_id) = payload.exam_id {
        separated.push("exam_id = ");
        separated.push_bind_unseparated(exam_id);
    }

    if let Some(subject) = payload.subject {
        separated.push("subject = ");
        separated.push_bind_unseparated(subject);
    }

    if let Some(topic) = payload.topic {
        separated.push("topic = ");
        separated.push_bind_unseparated(topic);
    }

    if let Some(difficulty) = payload.difficulty {
        separated.push("difficulty = ");
        separated.push_bind_unseparated(normalize_difficulty(Some(difficulty.as_str()))?);
    }

    if let Some(text) = payload.question_text {
        let text = clean_html(&text);
        if text.trim().is_empty() {
            return Err(AppError::BadRequest(
                "Question text cannot be empty".to_string(),
            ));
        }
        separated.push("question_text = ");
        separated.push_bind_unseparated(text);
    }

    if let Some(explanation) = payload.explanation {
        separated.push("explanation = ");
        separated.push_bind_unseparated(clean_html(&explanation));
    }

    if let Some(points) = payload.points {
        separated.push("points = ");
        separated.push_bind_unseparated(points);
    }

    builder.push(" WHERE id = ");
    builder.push_bind(id);

    let result = builder.build().execute(&pool).await.map_err(|e| {
        tracing::error!("Failed to update question: {:?}", e);
        AppError::from(e)
    })?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Question not found".to_string()));
    }

    Ok(StatusCode::OK)
}

/// Deletes a question by ID. Past responses keep their rows with the
/// question reference cleared.
pub async fn delete_question(
    State(pool): State<SqlitePool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let result = sqlx::query("DELETE FROM questions WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to delete question: {:?}", e);
            AppError::from(e)
        })?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Question not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}
