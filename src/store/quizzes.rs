//! Quiz and quiz-attempt row operations.

use super::SupabaseStore;
use crate::error::{AppError, Result};
use crate::models::{Quiz, QuizAttempt};
use serde_json::json;
use tracing::debug;
use uuid::Uuid;

const QUIZZES: &str = "quizzes";
const ATTEMPTS: &str = "quiz_attempts";

impl SupabaseStore {
    /// Insert a complete quiz and return the stored row.
    pub async fn insert_quiz(&self, quiz: &Quiz) -> Result<Quiz> {
        let url = self.table_url(QUIZZES)?;
        let response = self
            .with_service_auth(self.http.post(url))
            .header("Prefer", "return=representation")
            .json(&[quiz])
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(Self::table_error(QUIZZES, response).await);
        }
        let mut rows: Vec<Quiz> = response.json().await?;
        if rows.is_empty() {
            return Err(AppError::Database {
                table: QUIZZES.to_string(),
                detail: "insert returned no row".to_string(),
            });
        }
        let stored = rows.remove(0);
        debug!(id = %stored.id, title = %stored.title, "quiz stored");
        Ok(stored)
    }

    /// A user's quizzes, newest first.
    pub async fn list_quizzes(&self, user_id: &str) -> Result<Vec<Quiz>> {
        let url = self.table_url(QUIZZES)?;
        let response = self
            .with_service_auth(self.http.get(url))
            .query(&[
                ("select", "*".to_string()),
                ("user_id", format!("eq.{}", user_id)),
                ("order", "created_at.desc".to_string()),
            ])
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(Self::table_error(QUIZZES, response).await);
        }
        Ok(response.json().await?)
    }

    /// One quiz, scoped to its owner.
    pub async fn get_quiz(&self, user_id: &str, id: Uuid) -> Result<Quiz> {
        let url = self.table_url(QUIZZES)?;
        let response = self
            .with_service_auth(self.http.get(url))
            .query(&[
                ("select", "*".to_string()),
                ("id", format!("eq.{}", id)),
                ("user_id", format!("eq.{}", user_id)),
                ("limit", "1".to_string()),
            ])
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(Self::table_error(QUIZZES, response).await);
        }
        let mut rows: Vec<Quiz> = response.json().await?;
        if rows.is_empty() {
            return Err(AppError::RowNotFound {
                table: QUIZZES.to_string(),
                id: id.to_string(),
            });
        }
        Ok(rows.remove(0))
    }

    /// Attach the latest attempt's score to the quiz row.
    pub async fn set_quiz_score(&self, id: Uuid, score: u8) -> Result<()> {
        let url = self.table_url(QUIZZES)?;
        let response = self
            .with_service_auth(self.http.patch(url))
            .query(&[("id", format!("eq.{}", id))])
            .json(&json!({ "score": score }))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(Self::table_error(QUIZZES, response).await);
        }
        Ok(())
    }

    /// Record one completed run through a quiz.
    pub async fn insert_attempt(&self, attempt: &QuizAttempt) -> Result<()> {
        let url = self.table_url(ATTEMPTS)?;
        let response = self
            .with_service_auth(self.http.post(url))
            .json(&[attempt])
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(Self::table_error(ATTEMPTS, response).await);
        }
        debug!(quiz_id = %attempt.quiz_id, score = attempt.score, "attempt stored");
        Ok(())
    }

    /// Attempt history for one quiz, newest first.
    pub async fn list_attempts(&self, user_id: &str, quiz_id: Uuid) -> Result<Vec<QuizAttempt>> {
        let url = self.table_url(ATTEMPTS)?;
        let response = self
            .with_service_auth(self.http.get(url))
            .query(&[
                ("select", "*".to_string()),
                ("quiz_id", format!("eq.{}", quiz_id)),
                ("user_id", format!("eq.{}", user_id)),
                ("order", "created_at.desc".to_string()),
            ])
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(Self::table_error(ATTEMPTS, response).await);
        }
        Ok(response.json().await?)
    }
}
