//! REST API routes and handlers.
//!
//! Handlers validate minimally, call one external collaborator, read or
//! write rows, and return JSON. Failures are logged once, at the single
//! error-to-response mapping below, and surfaced as a generic error body.

use super::auth::AuthedUser;
use super::state::AppState;
use crate::error::{AppError, Result};
use crate::models::{
    derive_title, display_order, PlayNote, Question, QuestionResponse, Quiz, QuizAttempt,
};
use crate::playai::{SYNTHESIS_STYLE, VOICE1, VOICE2};
use crate::quizgen::extract_pdf_text;
use crate::session::{AnswerOutcome, QuizSession};
use crate::store::object_name;
use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{error, info};
use uuid::Uuid;

/// Build the full API router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/podcasts", post(create_podcast).get(list_podcasts))
        .route("/api/podcasts/in-progress", get(in_progress_podcast))
        .route("/api/podcasts/{id}/status", get(podcast_status))
        .route("/api/quizzes", post(create_quiz).get(list_quizzes))
        .route("/api/quizzes/{id}", get(get_quiz))
        .route("/api/quizzes/{id}/attempts", get(list_attempts))
        .route("/api/quizzes/{id}/sessions", post(start_session))
        .route("/api/sessions/{id}/answers", post(submit_answer))
        .with_state(state)
}

// ── Error mapping ─────────────────────────────────────────────────────────

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::JobAlreadyActive => StatusCode::CONFLICT,
            AppError::RowNotFound { .. } | AppError::SessionNotFound { .. } => {
                StatusCode::NOT_FOUND
            }
            AppError::InvalidUpload { .. }
            | AppError::NotAPdf { .. }
            | AppError::PdfText { .. }
            | AppError::SessionClosed { .. } => StatusCode::BAD_REQUEST,
            AppError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            AppError::SynthesisSubmit { .. }
            | AppError::SynthesisStatus { .. }
            | AppError::LlmApi { .. }
            | AppError::QuizShape { .. } => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        error!(%status, error = %self, "request failed");
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

// ── Shared upload handling ────────────────────────────────────────────────

struct PdfUpload {
    filename: String,
    bytes: Vec<u8>,
}

/// Pull the `file` part out of a multipart body and check it is a PDF.
async fn read_pdf_field(multipart: &mut Multipart) -> Result<PdfUpload> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::InvalidUpload {
            reason: e.to_string(),
        })?
    {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field.file_name().unwrap_or("document.pdf").to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::InvalidUpload {
                reason: e.to_string(),
            })?
            .to_vec();
        if !bytes.starts_with(b"%PDF") {
            return Err(AppError::NotAPdf { filename });
        }
        return Ok(PdfUpload { filename, bytes });
    }
    Err(AppError::InvalidUpload {
        reason: "missing 'file' field".to_string(),
    })
}

// ── Health ────────────────────────────────────────────────────────────────

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

// ── Podcasts ──────────────────────────────────────────────────────────────

async fn create_podcast(
    State(state): State<AppState>,
    AuthedUser(user_id): AuthedUser,
    mut multipart: Multipart,
) -> Result<impl IntoResponse> {
    let upload = read_pdf_field(&mut multipart).await?;

    let object = object_name(&upload.filename);
    let source_url = state.store.upload_pdf(&object, upload.bytes).await?;

    // Reserve the user's single job slot before touching the synthesis API.
    state.jobs.claim(&user_id, &object)?;

    let job = match state.playai.submit(&source_url).await {
        Ok(job) => job,
        Err(e) => {
            state.jobs.release(&user_id);
            return Err(e);
        }
    };
    state.jobs.set(&user_id, &job.id);

    let mut note = PlayNote::new(
        job.id.clone(),
        user_id.clone(),
        upload.filename.clone(),
        source_url,
        SYNTHESIS_STYLE,
        VOICE1,
        VOICE2,
        Some(upload.filename),
    );
    if let Some(requested_at) = job.requested_at {
        note.requested_at = requested_at;
    }

    if let Err(e) = state.store.upsert_playnote(&note).await {
        state.jobs.release(&user_id);
        return Err(e);
    }

    state.poller.spawn(user_id, job.id.clone());
    info!(job_id = %job.id, "podcast generation started");

    Ok((
        StatusCode::CREATED,
        Json(json!({ "id": job.id, "status": note.status })),
    ))
}

async fn list_podcasts(
    State(state): State<AppState>,
    AuthedUser(user_id): AuthedUser,
) -> Result<Json<Vec<PlayNote>>> {
    let mut notes = state.store.list_playnotes(&user_id).await?;
    display_order(&mut notes);
    Ok(Json(notes))
}

async fn in_progress_podcast(
    State(state): State<AppState>,
    AuthedUser(user_id): AuthedUser,
) -> Result<Json<serde_json::Value>> {
    let in_progress = state.store.in_progress_playnote(&user_id).await?;
    Ok(Json(json!({ "in_progress": in_progress })))
}

async fn podcast_status(
    State(state): State<AppState>,
    AuthedUser(_): AuthedUser,
    Path(id): Path<String>,
) -> Result<Json<crate::playai::JobStatusReport>> {
    Ok(Json(state.playai.status(&id).await?))
}

// ── Quizzes ───────────────────────────────────────────────────────────────

async fn create_quiz(
    State(state): State<AppState>,
    AuthedUser(user_id): AuthedUser,
    mut multipart: Multipart,
) -> Result<impl IntoResponse> {
    let upload = read_pdf_field(&mut multipart).await?;

    let text = extract_pdf_text(&upload.bytes)?;
    let questions = state.quizgen.generate(&text).await?;
    let quiz = Quiz::new(user_id, derive_title(&upload.filename), questions)?;
    let stored = state.store.insert_quiz(&quiz).await?;

    info!(quiz_id = %stored.id, title = %stored.title, "quiz created");
    Ok((StatusCode::CREATED, Json(stored)))
}

async fn list_quizzes(
    State(state): State<AppState>,
    AuthedUser(user_id): AuthedUser,
) -> Result<Json<Vec<Quiz>>> {
    Ok(Json(state.store.list_quizzes(&user_id).await?))
}

async fn get_quiz(
    State(state): State<AppState>,
    AuthedUser(user_id): AuthedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Quiz>> {
    Ok(Json(state.store.get_quiz(&user_id, id).await?))
}

async fn list_attempts(
    State(state): State<AppState>,
    AuthedUser(user_id): AuthedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<QuizAttempt>>> {
    Ok(Json(state.store.list_attempts(&user_id, id).await?))
}

// ── Quiz sessions ─────────────────────────────────────────────────────────

/// A question as shown to the taker: no answer key.
#[derive(Debug, Serialize)]
struct PublicQuestion {
    question: String,
    options: Vec<String>,
}

impl From<&Question> for PublicQuestion {
    fn from(q: &Question) -> Self {
        Self {
            question: q.question.clone(),
            options: q.options.clone(),
        }
    }
}

#[derive(Serialize)]
struct SessionStarted {
    session_id: Uuid,
    title: String,
    question_count: usize,
    question_index: usize,
    question: PublicQuestion,
}

#[derive(Deserialize)]
struct AnswerRequest {
    answer: String,
}

async fn start_session(
    State(state): State<AppState>,
    AuthedUser(user_id): AuthedUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let quiz = state.store.get_quiz(&user_id, id).await?;
    let session = QuizSession::new(quiz, &user_id)?;

    let title = session.quiz_title().to_string();
    let question_count = crate::models::QUESTIONS_PER_QUIZ;
    let first = session
        .current_question()
        .map(PublicQuestion::from)
        .ok_or(AppError::SessionClosed { id: session.id })?;

    let session_id = state.sessions.insert(session);
    Ok((
        StatusCode::CREATED,
        Json(SessionStarted {
            session_id,
            title,
            question_count,
            question_index: 0,
            question: first,
        }),
    ))
}

async fn submit_answer(
    State(state): State<AppState>,
    AuthedUser(user_id): AuthedUser,
    Path(id): Path<Uuid>,
    Json(request): Json<AnswerRequest>,
) -> Result<Response> {
    match state.sessions.answer(id, &user_id, &request.answer)? {
        AnswerOutcome::Next { question_index } => {
            let (_, question) = state.sessions.current_question(id, &user_id)?;
            Ok(Json(json!({
                "completed": false,
                "question_index": question_index,
                "question": PublicQuestion::from(&question),
            }))
            .into_response())
        }
        AnswerOutcome::Finished {
            quiz_id,
            score,
            responses,
        } => {
            persist_attempt(&state, quiz_id, &user_id, score, &responses).await?;
            Ok(Json(json!({
                "completed": true,
                "score": score,
                "responses": responses,
            }))
            .into_response())
        }
    }
}

/// Write the attempt row, then the score onto the quiz itself.
async fn persist_attempt(
    state: &AppState,
    quiz_id: Uuid,
    user_id: &str,
    score: u8,
    responses: &[QuestionResponse],
) -> Result<()> {
    let attempt = QuizAttempt::new(quiz_id, user_id, score, responses.to_vec());
    state.store.insert_attempt(&attempt).await?;
    state.store.set_quiz_score(quiz_id, score).await?;
    info!(%quiz_id, score, "quiz attempt recorded");
    Ok(())
}
