//! Domain records persisted in the hosted database.

pub mod playnote;
pub mod quiz;

pub use playnote::{display_order, PlayNote, PlayNoteStatus};
pub use quiz::{
    derive_title, score_percent, validate_questions, Question, QuestionResponse, Quiz,
    QuizAttempt, OPTIONS_PER_QUESTION, QUESTIONS_PER_QUIZ,
};
