// src/models/question.rs

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::{prelude::FromRow, types::Json};
use validator::Validate;

use crate::error::AppError;

pub const MIN_CHOICES: usize = 2;
pub const MAX_CHOICES: usize = 4;
pub const DIFFICULTIES: [&str; 3] = ["easy", "medium", "hard"];

/// Represents the 'questions' table in the database.
/// Carries the answer key, so it is only ever returned to admins.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Question {
    pub id: i64,

    /// Standalone questions have no exam yet.
    pub exam_id: Option<i64>,

    pub subject: String,
    pub topic: Option<String>,

    /// 'easy', 'medium' or 'hard'.
    pub difficulty: String,

    pub question_text: String,

    /// Two to four options, addressed as A..D in order.
    /// Stored as a JSON array in the database.
    pub options: Json<Vec<String>>,

    /// Letter of the correct option.
    pub correct_answer: String,

    pub explanation: Option<String>,

    /// `None` counts as 1 when grading.
    pub points: Option<i64>,

    pub created_at: NaiveDateTime,
}

/// DTO for sending a question to exam takers (no answer key, no explanation).
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct PublicQuestion {
    pub id: i64,
    pub subject: String,
    pub topic: Option<String>,
    pub difficulty: String,
    pub question_text: String,
    pub options: Json<Vec<String>>,
    pub points: Option<i64>,
}

/// DTO for creating a question. Admin only.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateQuestionRequest {
    /// Attach to an exam right away; may be set later via update.
    pub exam_id: Option<i64>,

    /// Section shortcut used when `subject` is absent: "math" or anything else.
    #[serde(rename = "type")]
    pub question_type: Option<String>,

    #[validate(length(min = 1, max = 100))]
    pub subject: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub topic: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub subtopic: Option<String>,

    pub difficulty: Option<String>,

    #[validate(length(min = 1, max = 5000))]
    pub question_text: String,

    #[validate(custom(function = validate_choices))]
    pub choices: Vec<String>,

    /// Zero-based index into `choices`.
    pub correct_answer: Option<i64>,

    #[validate(length(max = 5000))]
    pub explanation: Option<String>,

    #[validate(range(min = 0, max = 100))]
    pub points: Option<i64>,
}

impl CreateQuestionRequest {
    /// Subject to store: explicit, or derived from the section type.
    pub fn resolved_subject(&self) -> String {
        match (&self.subject, self.question_type.as_deref()) {
            (Some(subject), _) => subject.clone(),
            (None, Some("math")) => "Mathematics".to_string(),
            (None, _) => "Reading and Writing".to_string(),
        }
    }

    /// Topic to store, folding the subtopic in as "topic - subtopic".
    pub fn resolved_topic(&self) -> Option<String> {
        match (&self.topic, &self.subtopic) {
            (Some(topic), Some(sub)) => Some(format!("{} - {}", topic, sub)),
            (Some(topic), None) => Some(topic.clone()),
            (None, _) => None,
        }
    }

    /// Converts the zero-based `correct_answer` index into its letter.
    pub fn correct_letter(&self) -> Result<String, AppError> {
        let index = self
            .correct_answer
            .ok_or(AppError::BadRequest("Valid correct answer index is required".to_string()))?;

        usize::try_from(index)
            .ok()
            .filter(|i| *i < self.choices.len())
            .and_then(answer_letter)
            .map(|c| c.to_string())
            .ok_or(AppError::BadRequest("Valid correct answer index is required".to_string()))
    }
}

/// DTO for updating a question. Fields are optional.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateQuestionRequest {
    pub exam_id: Option<i64>,
    #[validate(length(min = 1, max = 100))]
    pub subject: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub topic: Option<String>,
    pub difficulty: Option<String>,
    #[validate(length(min = 1, max = 5000))]
    pub question_text: Option<String>,
    #[validate(length(max = 5000))]
    pub explanation: Option<String>,
    #[validate(range(min = 0, max = 100))]
    pub points: Option<i64>,
}

impl UpdateQuestionRequest {
    pub fn is_empty(&self) -> bool {
        self.exam_id.is_none()
            && self.subject.is_none()
            && self.topic.is_none()
            && self.difficulty.is_none()
            && self.question_text.is_none()
            && self.explanation.is_none()
            && self.points.is_none()
    }
}

/// Query parameters for the admin question listing.
#[derive(Debug, Default, Deserialize)]
pub struct QuestionFilter {
    pub subject: Option<String>,
    /// Substring match.
    pub topic: Option<String>,
    pub difficulty: Option<String>,
}

/// Maps an option index to its letter: 0 -> 'A' .. 3 -> 'D'.
pub fn answer_letter(index: usize) -> Option<char> {
    if index < MAX_CHOICES {
        Some((b'A' + index as u8) as char)
    } else {
        None
    }
}

/// Lower-cases and checks a difficulty tier, defaulting to "medium".
pub fn normalize_difficulty(difficulty: Option<&str>) -> Result<String, AppError> {
    let value = difficulty.unwrap_or("medium").trim().to_lowercase();
    if DIFFICULTIES.contains(&value.as_str()) {
        Ok(value)
    } else {
        Err(AppError::BadRequest(format!(
            "Difficulty must be one of: {}",
            DIFFICULTIES.join(", ")
        )))
    }
}

fn validate_choices(choices: &[String]) -> Result<(), validator::ValidationError> {
    if choices.len() < MIN_CHOICES || choices.len() > MAX_CHOICES {
        return Err(validator::ValidationError::new("choices_must_be_2_to_4"));
    }
    for choice in choices {
        if choice.trim().is_empty() {
            return Err(validator::ValidationError::new("choice_cannot_be_empty"));
        }
        if choice.len() > 1000 {
            return Err(validator::ValidationError::new("choice_too_long"));
        }
    }
    Ok(())
}
