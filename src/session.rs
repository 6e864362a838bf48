//! In-memory quiz-taking sessions.
//!
//! A session walks one user through a quiz's four questions, recording a
//! response per answer. The fourth answer finishes the session and yields
//! the score; persisting the attempt is the caller's job. Sessions live in
//! a concurrent map and are dropped as soon as they finish.

use crate::error::{AppError, Result};
use crate::models::{score_percent, Question, QuestionResponse, Quiz, QUESTIONS_PER_QUIZ};
use dashmap::DashMap;
use uuid::Uuid;

/// Result of submitting one answer.
#[derive(Debug)]
pub enum AnswerOutcome {
    /// More questions remain; the index of the next one to present.
    Next { question_index: usize },
    /// That was the last question. The session is finished.
    Finished {
        quiz_id: Uuid,
        score: u8,
        responses: Vec<QuestionResponse>,
    },
}

/// One user's walk through one quiz.
#[derive(Debug)]
pub struct QuizSession {
    pub id: Uuid,
    pub user_id: String,
    quiz: Quiz,
    responses: Vec<QuestionResponse>,
}

impl QuizSession {
    /// Start a session. The quiz must be complete (checked at construction
    /// of every [`Quiz`], re-checked here for rows read back from storage).
    pub fn new(quiz: Quiz, user_id: impl Into<String>) -> Result<Self> {
        crate::models::validate_questions(&quiz.questions)?;
        Ok(Self {
            id: Uuid::new_v4(),
            user_id: user_id.into(),
            quiz,
            responses: Vec::with_capacity(QUESTIONS_PER_QUIZ),
        })
    }

    pub fn quiz_id(&self) -> Uuid {
        self.quiz.id
    }

    pub fn quiz_title(&self) -> &str {
        &self.quiz.title
    }

    /// Index of the question awaiting an answer.
    pub fn current_index(&self) -> usize {
        self.responses.len()
    }

    /// The question awaiting an answer, or `None` once finished.
    pub fn current_question(&self) -> Option<&Question> {
        self.quiz.questions.get(self.responses.len())
    }

    /// Record an answer for the current question.
    ///
    /// Any string is accepted; one that is not the correct option simply
    /// counts as wrong, so a mistyped client cannot wedge a session.
    pub fn answer(&mut self, selected: &str) -> Result<AnswerOutcome> {
        let Some(question) = self.quiz.questions.get(self.responses.len()) else {
            return Err(AppError::SessionClosed { id: self.id });
        };

        self.responses.push(QuestionResponse {
            question: question.question.clone(),
            selected_answer: selected.to_string(),
            correct_answer: question.correct_answer.clone(),
            is_correct: selected == question.correct_answer,
        });

        if self.responses.len() < self.quiz.questions.len() {
            return Ok(AnswerOutcome::Next {
                question_index: self.responses.len(),
            });
        }

        let correct = self.responses.iter().filter(|r| r.is_correct).count();
        Ok(AnswerOutcome::Finished {
            quiz_id: self.quiz.id,
            score: score_percent(correct, self.quiz.questions.len()),
            responses: self.responses.clone(),
        })
    }
}

/// Concurrent registry of live sessions.
#[derive(Default)]
pub struct SessionStore {
    inner: DashMap<Uuid, QuizSession>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, session: QuizSession) -> Uuid {
        let id = session.id;
        self.inner.insert(id, session);
        id
    }

    /// Submit an answer to a session owned by `user_id`. Finished sessions
    /// are removed before this returns.
    pub fn answer(&self, id: Uuid, user_id: &str, selected: &str) -> Result<AnswerOutcome> {
        let outcome = {
            let mut session = self
                .inner
                .get_mut(&id)
                .ok_or(AppError::SessionNotFound { id })?;
            if session.user_id != user_id {
                return Err(AppError::SessionNotFound { id });
            }
            session.answer(selected)?
        };
        if matches!(outcome, AnswerOutcome::Finished { .. }) {
            self.inner.remove(&id);
        }
        Ok(outcome)
    }

    /// Look up the question a session is waiting on.
    pub fn current_question(&self, id: Uuid, user_id: &str) -> Result<(usize, Question)> {
        let session = self
            .inner
            .get(&id)
            .ok_or(AppError::SessionNotFound { id })?;
        if session.user_id != user_id {
            return Err(AppError::SessionNotFound { id });
        }
        let index = session.current_index();
        let question = session
            .current_question()
            .cloned()
            .ok_or(AppError::SessionClosed { id })?;
        Ok((index, question))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quiz() -> Quiz {
        let questions = (0..4)
            .map(|i| Question {
                question: format!("Q{}?", i),
                options: vec![
                    format!("right {}", i),
                    "wrong a".into(),
                    "wrong b".into(),
                    "wrong c".into(),
                ],
                correct_answer: format!("right {}", i),
            })
            .collect();
        Quiz::new("user-1", "Sample", questions).unwrap()
    }

    #[test]
    fn full_walk_scores_three_of_four_as_75() {
        let mut session = QuizSession::new(quiz(), "user-1").unwrap();
        assert_eq!(session.current_index(), 0);

        assert!(matches!(
            session.answer("right 0").unwrap(),
            AnswerOutcome::Next { question_index: 1 }
        ));
        assert!(matches!(
            session.answer("right 1").unwrap(),
            AnswerOutcome::Next { question_index: 2 }
        ));
        assert!(matches!(
            session.answer("wrong a").unwrap(),
            AnswerOutcome::Next { question_index: 3 }
        ));

        match session.answer("right 3").unwrap() {
            AnswerOutcome::Finished {
                score, responses, ..
            } => {
                assert_eq!(score, 75);
                assert_eq!(responses.len(), 4);
                assert!(!responses[2].is_correct);
                assert_eq!(responses[2].selected_answer, "wrong a");
                assert_eq!(responses[2].correct_answer, "right 2");
            }
            other => panic!("expected Finished, got {:?}", other),
        }
    }

    #[test]
    fn answering_past_the_end_is_an_error() {
        let mut session = QuizSession::new(quiz(), "user-1").unwrap();
        for i in 0..4 {
            session.answer(&format!("right {}", i)).unwrap();
        }
        assert!(matches!(
            session.answer("anything"),
            Err(AppError::SessionClosed { .. })
        ));
    }

    #[test]
    fn unlisted_answer_counts_as_wrong() {
        let mut session = QuizSession::new(quiz(), "user-1").unwrap();
        session.answer("not an option at all").unwrap();
        for i in 1..3 {
            session.answer(&format!("right {}", i)).unwrap();
        }
        match session.answer("right 3").unwrap() {
            AnswerOutcome::Finished { score, .. } => assert_eq!(score, 75),
            other => panic!("expected Finished, got {:?}", other),
        }
    }

    #[test]
    fn store_scopes_sessions_to_their_owner() {
        let store = SessionStore::new();
        let id = store.insert(QuizSession::new(quiz(), "user-1").unwrap());

        assert!(matches!(
            store.answer(id, "someone-else", "right 0"),
            Err(AppError::SessionNotFound { .. })
        ));
        assert!(store.answer(id, "user-1", "right 0").is_ok());
    }

    #[test]
    fn store_drops_finished_sessions() {
        let store = SessionStore::new();
        let id = store.insert(QuizSession::new(quiz(), "user-1").unwrap());
        for i in 0..4 {
            store.answer(id, "user-1", &format!("right {}", i)).unwrap();
        }
        assert!(matches!(
            store.answer(id, "user-1", "again"),
            Err(AppError::SessionNotFound { .. })
        ));
    }

    #[test]
    fn current_question_never_leaks_the_answer_key_shape() {
        let store = SessionStore::new();
        let id = store.insert(QuizSession::new(quiz(), "user-1").unwrap());
        let (index, question) = store.current_question(id, "user-1").unwrap();
        assert_eq!(index, 0);
        assert_eq!(question.options.len(), 4);
    }
}
