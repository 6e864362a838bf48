//! # pdfcast
//!
//! Web service that turns an uploaded PDF into a two-voice audio podcast
//! (via the Play.ai synthesis API) or a four-question multiple-choice quiz
//! (via an OpenAI-compatible LLM), persisting results per user in a hosted
//! Supabase backend.
//!
//! # Pipeline overview
//!
//! ```text
//! PDF upload
//!  │
//!  ├─ podcast: store in bucket → submit job → poll status → playnote row
//!  └─ quiz:    extract text → LLM (streamed JSON) → validate → quiz row
//!                                                    │
//!                              quiz session (in memory) → scored attempt row
//! ```
//!
//! Every operation is request-scoped glue: validate, call one external API,
//! read or write rows, return JSON. The only background work is the status
//! poller, one task per in-flight synthesis job.

pub mod config;
pub mod error;
pub mod models;
pub mod playai;
pub mod poller;
pub mod prompts;
pub mod quizgen;
pub mod session;
pub mod store;
pub mod web;

pub use config::AppConfig;
pub use error::{AppError, Result};
pub use models::{PlayNote, PlayNoteStatus, Question, Quiz, QuizAttempt};
pub use playai::PlayAiClient;
pub use poller::{ActiveJobs, JobPoller, PollSettings};
pub use quizgen::QuizGenerator;
pub use session::{AnswerOutcome, QuizSession, SessionStore};
pub use store::SupabaseStore;
pub use web::{AppState, ServerConfig, WebServer};
