// src/models/exam.rs

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::models::question::PublicQuestion;

/// Represents the 'exams' table, joined with the creator's name.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Exam {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,

    /// Time limit in minutes.
    pub duration: i64,

    /// Nominal question count shown to students. Not reconciled with the
    /// questions actually attached to the exam.
    pub total_questions: i64,

    /// Minimum percentage required to pass.
    pub passing_score: i64,

    pub subject: Option<String>,
    pub difficulty: Option<String>,
    pub created_by: Option<i64>,

    /// From a LEFT JOIN on users; `None` once the creator is gone.
    pub creator_name: Option<String>,

    /// `false` once soft-deleted.
    pub is_active: bool,

    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Exam metadata plus its question set with answer keys stripped.
#[derive(Debug, Serialize)]
pub struct ExamDetail {
    pub exam: Exam,
    pub questions: Vec<PublicQuestion>,
}

/// DTO for creating an exam. Admin only.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateExamRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    #[validate(range(min = 1, max = 600))]
    pub duration: i64,
    #[validate(range(min = 1, max = 500))]
    pub total_questions: i64,
    #[validate(range(min = 0, max = 100))]
    pub passing_score: i64,
    #[validate(length(max = 100))]
    pub subject: Option<String>,
    #[validate(length(max = 20))]
    pub difficulty: Option<String>,
}
