// src/handlers/stats.rs
//
// Dashboard aggregates. Read-only and advisory: no transaction, each query
// sees whatever is committed at the time it runs.

use axum::{
    Extension, Json,
    extract::{Query, State},
    response::IntoResponse,
};
use sqlx::SqlitePool;

use crate::{
    error::AppError,
    models::{
        attempt::UserAttempt,
        stats::{
            AdminDashboard, AdminTotals, AttemptTotals, GrowthPoint, RecentExam, RecentExamRow,
            RecentSession, RecentUser, RecentUserRow, SubjectCount, SubjectShare, TopicProgress,
            TopicProgressRow, UserDashboard, UserStats, UserStatsQuery,
        },
    },
    utils::jwt::{Claims, is_admin},
};

async fn count(pool: &SqlitePool, sql: &str) -> Result<i64, AppError> {
    let n: i64 = sqlx::query_scalar(sql).fetch_one(pool).await?;
    Ok(n)
}

/// Dashboard for the caller, or for `user_id` when the caller is an admin.
pub async fn user_stats(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Query(params): Query<UserStatsQuery>,
) -> Result<impl IntoResponse, AppError> {
    let caller = claims.user_id()?;
    let user_id = params.user_id.unwrap_or(caller);

    if user_id != caller && !is_admin(&pool, caller).await? {
        return Err(AppError::Forbidden(
            "Cannot view another user's statistics".to_string(),
        ));
    }

    sqlx::query_scalar::<_, i64>("SELECT id FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(&pool)
        .await?
        .ok_or(AppError::NotFound("User not found".to_string()))?;

    let totals = sqlx::query_as::<_, AttemptTotals>(
        r#"
        SELECT
            COUNT(*) AS total_attempts,
            COALESCE(SUM(correct_answers), 0) AS total_correct,
            COALESCE(SUM(total_questions), 0) AS total_questions,
            COALESCE(MAX(score), 0) AS best_score,
            COALESCE(AVG(score), 0.0) AS avg_score,
            COALESCE(SUM(time_spent), 0) AS total_time_seconds
        FROM user_exam_attempts
        WHERE user_id = $1
        "#,
    )
    .bind(user_id)
    .fetch_one(&pool)
    .await?;

    let streak_days: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(DISTINCT date(completed_at))
        FROM user_exam_attempts
        WHERE user_id = $1 AND completed_at >= datetime('now', '-30 days')
        "#,
    )
    .bind(user_id)
    .fetch_one(&pool)
    .await?;

    let recent_sessions = sqlx::query_as::<_, RecentSession>(
        r#"
        SELECT
            a.id, e.title AS exam_title, e.subject, a.score,
            a.total_questions, a.correct_answers, a.time_spent, a.completed_at
        FROM user_exam_attempts a
        JOIN exams e ON a.exam_id = e.id
        WHERE a.user_id = $1
        ORDER BY a.completed_at DESC, a.id DESC
        LIMIT 5
        "#,
    )
    .bind(user_id)
    .fetch_all(&pool)
    .await?;

    let topic_progress = sqlx::query_as::<_, TopicProgressRow>(
        r#"
        SELECT subject, topic, questions_attempted, questions_correct,
               total_time_spent, last_practiced
        FROM user_progress
        WHERE user_id = $1
        ORDER BY last_practiced DESC
        LIMIT 10
        "#,
    )
    .bind(user_id)
    .fetch_all(&pool)
    .await?
    .into_iter()
    .map(TopicProgress::from)
    .collect();

    Ok(Json(UserDashboard {
        user_id,
        stats: UserStats::from_totals(&totals, streak_days),
        recent_sessions,
        topic_progress,
    }))
}

/// The caller's attempt history, newest first.
pub async fn user_attempts(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;

    let attempts = sqlx::query_as::<_, UserAttempt>(
        r#"
        SELECT
            a.id, a.exam_id, a.score, a.total_questions, a.correct_answers,
            a.time_spent, a.passed, a.started_at, a.completed_at,
            e.title AS exam_title, e.description AS exam_description, e.passing_score
        FROM user_exam_attempts a
        JOIN exams e ON a.exam_id = e.id
        WHERE a.user_id = $1
        ORDER BY a.completed_at DESC, a.id DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(&pool)
    .await?;

    Ok(Json(attempts))
}

/// Site-wide dashboard. Admin only.
pub async fn admin_stats(State(pool): State<SqlitePool>) -> Result<impl IntoResponse, AppError> {
    let stats = AdminTotals {
        total_users: count(&pool, "SELECT COUNT(*) FROM users").await?,
        new_users_today: count(
            &pool,
            "SELECT COUNT(*) FROM users WHERE date(created_at) = date('now')",
        )
        .await?,
        total_exams: count(&pool, "SELECT COUNT(*) FROM exams WHERE is_active = 1").await?,
        total_questions: count(&pool, "SELECT COUNT(*) FROM questions").await?,
        questions_added_today: count(
            &pool,
            "SELECT COUNT(*) FROM questions WHERE date(created_at) = date('now')",
        )
        .await?,
        total_topics: count(&pool, "SELECT COUNT(DISTINCT subject) FROM questions").await?,
        active_sessions: count(
            &pool,
            "SELECT COUNT(DISTINCT user_id) FROM user_exam_attempts WHERE completed_at >= datetime('now', '-1 day')",
        )
        .await?,
    };

    let recent_users = sqlx::query_as::<_, RecentUserRow>(
        r#"
        SELECT
            u.id, u.name, u.email, u.role, u.created_at,
            COALESCE(MAX(a.score), 0) AS best_score,
            COUNT(a.id) AS attempts_count
        FROM users u
        LEFT JOIN user_exam_attempts a ON u.id = a.user_id
        GROUP BY u.id, u.name, u.email, u.role, u.created_at
        ORDER BY u.created_at DESC, u.id DESC
        LIMIT 10
        "#,
    )
    .fetch_all(&pool)
    .await?
    .into_iter()
    .map(RecentUser::from)
    .collect();

    let recent_exams = sqlx::query_as::<_, RecentExamRow>(
        r#"
        SELECT
            e.id, e.title, e.subject, e.difficulty, e.created_at, e.is_active,
            COUNT(q.id) AS question_count
        FROM exams e
        LEFT JOIN questions q ON e.id = q.exam_id
        GROUP BY e.id, e.title, e.subject, e.difficulty, e.created_at, e.is_active
        ORDER BY e.created_at DESC, e.id DESC
        LIMIT 10
        "#,
    )
    .fetch_all(&pool)
    .await?
    .into_iter()
    .map(RecentExam::from)
    .collect();

    let subject_counts = sqlx::query_as::<_, SubjectCount>(
        r#"
        SELECT subject, COUNT(*) AS count
        FROM questions
        GROUP BY subject
        ORDER BY count DESC, subject
        "#,
    )
    .fetch_all(&pool)
    .await?;

    let user_growth = sqlx::query_as::<_, GrowthPoint>(
        r#"
        SELECT date(created_at) AS date, COUNT(*) AS count
        FROM users
        WHERE created_at >= datetime('now', '-7 days')
        GROUP BY date(created_at)
        ORDER BY date ASC
        "#,
    )
    .fetch_all(&pool)
    .await?;

    Ok(Json(AdminDashboard {
        question_distribution: SubjectShare::from_counts(subject_counts, stats.total_questions),
        stats,
        recent_users,
        recent_exams,
        user_growth,
    }))
}
