//! Error types for the pdfcast service.
//!
//! One error enum covers every failure family the service can hit: upload
//! validation, authentication, the two external APIs (voice synthesis and
//! LLM), the hosted database, and in-memory quiz sessions. The web layer
//! maps each variant to an HTTP status in exactly one place; handlers and
//! clients propagate with `?`.

use thiserror::Error;
use uuid::Uuid;

/// All errors returned by the pdfcast library.
#[derive(Debug, Error)]
pub enum AppError {
    // ── Upload errors ─────────────────────────────────────────────────────
    /// The multipart request was missing or malformed.
    #[error("Invalid upload: {reason}")]
    InvalidUpload { reason: String },

    /// The uploaded file does not start with a PDF header.
    #[error("'{filename}' is not a PDF file")]
    NotAPdf { filename: String },

    // ── Auth errors ───────────────────────────────────────────────────────
    /// No bearer token was supplied, or the token was rejected.
    #[error("Not authenticated")]
    Unauthorized,

    /// The auth backend could not be reached or returned garbage.
    #[error("Auth lookup failed: {detail}")]
    AuthFailed { detail: String },

    // ── Storage / database errors ─────────────────────────────────────────
    /// Object storage refused the upload.
    #[error("Failed to store '{object}': {detail}")]
    StorageUpload { object: String, detail: String },

    /// A table operation failed.
    #[error("Database error on '{table}': {detail}")]
    Database { table: String, detail: String },

    /// A row the caller asked for does not exist.
    #[error("No row '{id}' in '{table}'")]
    RowNotFound { table: String, id: String },

    // ── Synthesis API errors ──────────────────────────────────────────────
    /// Job submission was rejected.
    #[error("Podcast job submission failed: {detail}")]
    SynthesisSubmit { detail: String },

    /// A status poll was rejected for a reason other than rate limiting.
    #[error("Status check failed for job '{job_id}': {detail}")]
    SynthesisStatus { job_id: String, detail: String },

    /// The API returned HTTP 429; the caller should back off.
    ///
    /// `retry_after_secs` carries a server-specified delay when one was sent.
    #[error("Rate limit exceeded")]
    RateLimited { retry_after_secs: Option<u64> },

    /// A user already has a generation job in flight.
    #[error("A podcast is already being generated for this account")]
    JobAlreadyActive,

    // ── Quiz errors ───────────────────────────────────────────────────────
    /// The LLM call itself failed.
    #[error("LLM API error: {detail}")]
    LlmApi { detail: String },

    /// The LLM answered, but the payload does not match the question schema.
    #[error("Generated quiz is malformed: {reason}")]
    QuizShape { reason: String },

    /// Text extraction from the uploaded PDF failed.
    #[error("Could not extract text from PDF: {detail}")]
    PdfText { detail: String },

    /// No quiz session with this id (or it belongs to someone else).
    #[error("No active quiz session '{id}'")]
    SessionNotFound { id: Uuid },

    /// All four questions were already answered.
    #[error("Quiz session '{id}' is already finished")]
    SessionClosed { id: Uuid },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Configuration was missing or failed validation.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Transport ─────────────────────────────────────────────────────────
    /// An HTTP request could not be performed at all.
    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limited_display() {
        let e = AppError::RateLimited {
            retry_after_secs: Some(2),
        };
        assert!(e.to_string().contains("Rate limit"));
    }

    #[test]
    fn not_a_pdf_names_the_file() {
        let e = AppError::NotAPdf {
            filename: "notes.docx".into(),
        };
        assert!(e.to_string().contains("notes.docx"));
    }

    #[test]
    fn row_not_found_names_table_and_id() {
        let e = AppError::RowNotFound {
            table: "quizzes".into(),
            id: "abc".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("quizzes"));
        assert!(msg.contains("abc"));
    }
}
