//! Quizzes, questions and scored attempts.
//!
//! A quiz is complete only when it carries exactly [`QUESTIONS_PER_QUIZ`]
//! validated questions; nothing downstream (sessions, scoring, persistence)
//! accepts a partial one. Question payloads use camelCase field names so
//! rows written here stay readable by the original web clients.

use crate::error::{AppError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Every quiz has exactly this many questions.
pub const QUESTIONS_PER_QUIZ: usize = 4;

/// Every question offers exactly this many options.
pub const OPTIONS_PER_QUESTION: usize = 4;

/// One multiple-choice question.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub question: String,
    pub options: Vec<String>,
    pub correct_answer: String,
}

impl Question {
    /// Shape check for a single question: four non-empty options, a
    /// non-empty prompt, and the correct answer listed among the options.
    fn check(&self, index: usize) -> Result<()> {
        if self.question.trim().is_empty() {
            return Err(AppError::QuizShape {
                reason: format!("question {} has an empty prompt", index + 1),
            });
        }
        if self.options.len() != OPTIONS_PER_QUESTION {
            return Err(AppError::QuizShape {
                reason: format!(
                    "question {} has {} options, expected {}",
                    index + 1,
                    self.options.len(),
                    OPTIONS_PER_QUESTION
                ),
            });
        }
        if self.options.iter().any(|o| o.trim().is_empty()) {
            return Err(AppError::QuizShape {
                reason: format!("question {} has an empty option", index + 1),
            });
        }
        if !self.options.contains(&self.correct_answer) {
            return Err(AppError::QuizShape {
                reason: format!(
                    "question {}'s correct answer is not among its options",
                    index + 1
                ),
            });
        }
        Ok(())
    }
}

/// Validate a full question set: exactly four questions, each well-formed.
pub fn validate_questions(questions: &[Question]) -> Result<()> {
    if questions.len() != QUESTIONS_PER_QUIZ {
        return Err(AppError::QuizShape {
            reason: format!(
                "expected {} questions, got {}",
                QUESTIONS_PER_QUIZ,
                questions.len()
            ),
        });
    }
    for (i, q) in questions.iter().enumerate() {
        q.check(i)?;
    }
    Ok(())
}

/// A stored quiz. `score` is absent until the first completed attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quiz {
    pub id: Uuid,
    pub user_id: String,
    pub title: String,
    pub questions: Vec<Question>,
    pub score: Option<u8>,
    pub created_at: DateTime<Utc>,
}

impl Quiz {
    /// Build a quiz, refusing anything but a complete question set.
    pub fn new(
        user_id: impl Into<String>,
        title: impl Into<String>,
        questions: Vec<Question>,
    ) -> Result<Self> {
        validate_questions(&questions)?;
        Ok(Self {
            id: Uuid::new_v4(),
            user_id: user_id.into(),
            title: title.into(),
            questions,
            score: None,
            created_at: Utc::now(),
        })
    }
}

/// What the user picked for one question, compared against the answer key.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionResponse {
    pub question: String,
    pub selected_answer: String,
    pub correct_answer: String,
    pub is_correct: bool,
}

/// One scored run through a quiz. Immutable once written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizAttempt {
    pub id: Uuid,
    pub quiz_id: Uuid,
    pub user_id: String,
    pub score: u8,
    pub question_responses: Vec<QuestionResponse>,
    pub created_at: DateTime<Utc>,
}

impl QuizAttempt {
    pub fn new(
        quiz_id: Uuid,
        user_id: impl Into<String>,
        score: u8,
        question_responses: Vec<QuestionResponse>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            quiz_id,
            user_id: user_id.into(),
            score,
            question_responses,
            created_at: Utc::now(),
        }
    }
}

/// Score as an integer percentage, rounded to nearest.
pub fn score_percent(correct: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    ((correct as f64 / total as f64) * 100.0).round() as u8
}

/// Derive a quiz title from the source file name: drop the extension,
/// split on `-`/`_`, Title Case each word.
pub fn derive_title(filename: &str) -> String {
    let stem = match filename.rfind('.') {
        Some(idx) if idx > 0 => &filename[..idx],
        _ => filename,
    };
    stem.split(['-', '_'])
        .filter(|w| !w.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => {
                    first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
                }
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
