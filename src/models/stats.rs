// src/models/stats.rs
//
// Read-side dashboard shapes. Rows come straight from aggregate queries;
// the derived fields (percentages, hours, statuses) are computed here.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::services::scoring::round_percent;

/// Query parameters for the user dashboard.
#[derive(Debug, Deserialize)]
pub struct UserStatsQuery {
    /// Admins may inspect another user's dashboard.
    pub user_id: Option<i64>,
}

/// Aggregate over a user's attempts.
#[derive(Debug, Clone, Default, FromRow)]
pub struct AttemptTotals {
    pub total_attempts: i64,
    pub total_correct: i64,
    pub total_questions: i64,
    pub best_score: i64,
    pub avg_score: f64,
    pub total_time_seconds: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserStats {
    pub questions_answered: i64,
    pub correct_answers: i64,
    /// Percentage of correct answers over all attempts.
    pub accuracy: i64,
    /// Rounded hours.
    pub study_time: i64,
    /// Distinct active days in the last 30 days.
    pub current_streak: i64,
    pub best_score: i64,
    pub avg_score: i64,
    pub total_attempts: i64,
}

impl UserStats {
    pub fn from_totals(totals: &AttemptTotals, streak_days: i64) -> Self {
        Self {
            questions_answered: totals.total_questions,
            correct_answers: totals.total_correct,
            accuracy: round_percent(totals.total_correct, totals.total_questions),
            study_time: (totals.total_time_seconds as f64 / 3600.0).round() as i64,
            current_streak: streak_days,
            best_score: totals.best_score,
            avg_score: totals.avg_score.round() as i64,
            total_attempts: totals.total_attempts,
        }
    }
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct RecentSession {
    pub id: i64,
    pub exam_title: String,
    pub subject: Option<String>,
    pub score: i64,
    pub total_questions: i64,
    pub correct_answers: i64,
    pub time_spent: i64,
    pub completed_at: NaiveDateTime,
}

/// Represents the 'user_progress' table.
#[derive(Debug, Clone, FromRow)]
pub struct TopicProgressRow {
    pub subject: String,
    pub topic: String,
    pub questions_attempted: i64,
    pub questions_correct: i64,
    pub total_time_spent: i64,
    pub last_practiced: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TopicProgress {
    pub subject: String,
    pub topic: String,
    pub questions: i64,
    pub correct: i64,
    pub time_spent: i64,
    /// Accuracy on this topic, as a percentage.
    pub progress: i64,
    pub last_practiced: Option<NaiveDateTime>,
}

impl From<TopicProgressRow> for TopicProgress {
    fn from(row: TopicProgressRow) -> Self {
        Self {
            progress: round_percent(row.questions_correct, row.questions_attempted),
            subject: row.subject,
            topic: row.topic,
            questions: row.questions_attempted,
            correct: row.questions_correct,
            time_spent: row.total_time_spent,
            last_practiced: row.last_practiced,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UserDashboard {
    pub user_id: i64,
    pub stats: UserStats,
    pub recent_sessions: Vec<RecentSession>,
    pub topic_progress: Vec<TopicProgress>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct AdminTotals {
    pub total_users: i64,
    pub new_users_today: i64,
    pub total_exams: i64,
    pub total_questions: i64,
    pub questions_added_today: i64,
    pub total_topics: i64,
    /// Users with a completed attempt in the last 24 hours.
    pub active_sessions: i64,
}

#[derive(Debug, Clone, FromRow)]
pub struct RecentUserRow {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub role: String,
    pub created_at: NaiveDateTime,
    pub best_score: i64,
    pub attempts_count: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecentUser {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub role: String,
    pub joined: NaiveDate,
    /// "Active" once the user has at least one attempt.
    pub status: &'static str,
    pub score: i64,
}

impl From<RecentUserRow> for RecentUser {
    fn from(row: RecentUserRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            email: row.email,
            role: row.role,
            joined: row.created_at.date(),
            status: if row.attempts_count > 0 { "Active" } else { "Inactive" },
            score: row.best_score,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct RecentExamRow {
    pub id: i64,
    pub title: String,
    pub subject: Option<String>,
    pub difficulty: Option<String>,
    pub created_at: NaiveDateTime,
    pub is_active: bool,
    pub question_count: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecentExam {
    pub id: i64,
    pub title: String,
    pub subject: Option<String>,
    pub difficulty: String,
    /// "Published" while active, "Draft" once soft-deleted.
    pub status: &'static str,
    pub created: NaiveDate,
    pub question_count: i64,
}

impl From<RecentExamRow> for RecentExam {
    fn from(row: RecentExamRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            subject: row.subject,
            difficulty: row.difficulty.unwrap_or_else(|| "medium".to_string()),
            status: if row.is_active { "Published" } else { "Draft" },
            created: row.created_at.date(),
            question_count: row.question_count,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct SubjectCount {
    pub subject: String,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubjectShare {
    pub subject: String,
    pub count: i64,
    pub percentage: i64,
}

impl SubjectShare {
    pub fn from_counts(counts: Vec<SubjectCount>, total_questions: i64) -> Vec<Self> {
        counts
            .into_iter()
            .map(|c| Self {
                percentage: round_percent(c.count, total_questions),
                subject: c.subject,
                count: c.count,
            })
            .collect()
    }
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct GrowthPoint {
    pub date: String,
    pub count: i64,
}

#[derive(Debug, Serialize)]
pub struct AdminDashboard {
    pub stats: AdminTotals,
    pub recent_users: Vec<RecentUser>,
    pub recent_exams: Vec<RecentExam>,
    pub question_distribution: Vec<SubjectShare>,
    pub user_growth: Vec<GrowthPoint>,
}
