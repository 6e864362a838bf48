//! Quiz generation: PDF text → streamed LLM completion → validated questions.
//!
//! The completion is requested as a streamed JSON object and accumulated
//! chunk by chunk; once the stream ends, the buffer is parsed and validated
//! against the fixed question shape. A response that parses but does not
//! contain exactly four well-formed questions fails the generation as a
//! whole; no partial quiz is ever persisted.

use crate::config::AppConfig;
use crate::error::{AppError, Result};
use crate::models::{validate_questions, Question};
use crate::prompts::{quiz_user_prompt, QUIZ_SYSTEM_PROMPT};
use async_openai::config::OpenAIConfig;
use async_openai::types::{
    ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
    CreateChatCompletionRequestArgs, ResponseFormat,
};
use async_openai::Client;
use futures::StreamExt;
use serde::Deserialize;
use tracing::{debug, info};

/// Upper bound on document text sent to the model. Four questions do not
/// need more context than this, and oversized prompts hit token limits.
const MAX_DOCUMENT_CHARS: usize = 48_000;

/// Sampling temperature: low, the quiz should stick to the document.
const TEMPERATURE: f32 = 0.2;

/// Client for structured quiz generation against an OpenAI-compatible API.
pub struct QuizGenerator {
    client: Client<OpenAIConfig>,
    model: String,
}

#[derive(Deserialize)]
struct QuestionsPayload {
    questions: Vec<Question>,
}

impl QuizGenerator {
    pub fn new(config: &AppConfig) -> Self {
        let mut openai_config = OpenAIConfig::new().with_api_key(config.llm_api_key.clone());
        if !config.llm_base_url.is_empty() {
            openai_config = openai_config.with_api_base(config.llm_base_url.clone());
        }
        Self {
            client: Client::with_config(openai_config),
            model: config.llm_model.clone(),
        }
    }

    /// Generate four validated questions from document text.
    pub async fn generate(&self, document_text: &str) -> Result<Vec<Question>> {
        let text = truncate_chars(document_text, MAX_DOCUMENT_CHARS);
        if text.trim().is_empty() {
            return Err(AppError::PdfText {
                detail: "document contains no extractable text".into(),
            });
        }

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .temperature(TEMPERATURE)
            .response_format(ResponseFormat::JsonObject)
            .messages([
                ChatCompletionRequestSystemMessageArgs::default()
                    .content(QUIZ_SYSTEM_PROMPT)
                    .build()
                    .map_err(llm_err)?
                    .into(),
                ChatCompletionRequestUserMessageArgs::default()
                    .content(quiz_user_prompt(text))
                    .build()
                    .map_err(llm_err)?
                    .into(),
            ])
            .build()
            .map_err(llm_err)?;

        debug!(model = %self.model, chars = text.len(), "requesting quiz generation");
        let mut stream = self
            .client
            .chat()
            .create_stream(request)
            .await
            .map_err(llm_err)?;

        let mut buffer = String::new();
        while let Some(chunk) = stream.next().await {
            let response = chunk.map_err(llm_err)?;
            for choice in &response.choices {
                if let Some(content) = &choice.delta.content {
                    buffer.push_str(content);
                }
            }
        }

        let questions = parse_questions(&buffer)?;
        validate_questions(&questions)?;
        info!(count = questions.len(), "quiz generated");
        Ok(questions)
    }
}

fn llm_err(e: impl std::fmt::Display) -> AppError {
    AppError::LlmApi {
        detail: e.to_string(),
    }
}

/// Parse an accumulated completion into questions.
///
/// Accepts the requested `{"questions": [...]}` object, a bare array, and
/// either of those wrapped in markdown code fences (models add them despite
/// instructions).
pub fn parse_questions(raw: &str) -> Result<Vec<Question>> {
    let cleaned = strip_code_fences(raw.trim());
    if let Ok(payload) = serde_json::from_str::<QuestionsPayload>(cleaned) {
        return Ok(payload.questions);
    }
    if let Ok(questions) = serde_json::from_str::<Vec<Question>>(cleaned) {
        return Ok(questions);
    }
    Err(AppError::QuizShape {
        reason: "response is not a question list".into(),
    })
}

fn strip_code_fences(s: &str) -> &str {
    let s = s.trim();
    let Some(rest) = s.strip_prefix("```") else {
        return s;
    };
    // Drop the language tag on the opening fence line, then the closing fence.
    let rest = match rest.find('\n') {
        Some(idx) => &rest[idx + 1..],
        None => rest,
    };
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

/// Truncate on a char boundary without allocating when already short enough.
fn truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Extract plain text from PDF bytes, page by page.
pub fn extract_pdf_text(bytes: &[u8]) -> Result<String> {
    let doc = lopdf::Document::load_mem(bytes).map_err(|e| AppError::PdfText {
        detail: e.to_string(),
    })?;
    let mut pages: Vec<u32> = doc.get_pages().keys().copied().collect();
    pages.sort_unstable();

    let mut text = String::new();
    for page in pages {
        match doc.extract_text(&[page]) {
            Ok(t) => {
                text.push_str(&t);
                text.push('\n');
            }
            // A single unreadable page should not sink the document.
            Err(e) => debug!(page, error = %e, "skipping unextractable page"),
        }
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID_OBJECT: &str = r#"{
        "questions": [
            {"question": "Q1?", "options": ["a","b","c","d"], "correctAnswer": "a"},
            {"question": "Q2?", "options": ["a","b","c","d"], "correctAnswer": "b"},
            {"question": "Q3?", "options": ["a","b","c","d"], "correctAnswer": "c"},
            {"question": "Q4?", "options": ["a","b","c","d"], "correctAnswer": "d"}
        ]
    }"#;

    #[test]
    fn parses_questions_object() {
        let questions = parse_questions(VALID_OBJECT).unwrap();
        assert_eq!(questions.len(), 4);
        assert_eq!(questions[1].correct_answer, "b");
        assert!(validate_questions(&questions).is_ok());
    }

    #[test]
    fn parses_bare_array() {
        let raw = r#"[
            {"question": "Q1?", "options": ["a","b","c","d"], "correctAnswer": "a"}
        ]"#;
        let questions = parse_questions(raw).unwrap();
        assert_eq!(questions.len(), 1);
    }

    #[test]
    fn strips_markdown_fences() {
        let fenced = format!("```json\n{}\n```", VALID_OBJECT);
        let questions = parse_questions(&fenced).unwrap();
        assert_eq!(questions.len(), 4);
    }

    #[test]
    fn rejects_non_json() {
        assert!(parse_questions("Here are your questions!").is_err());
    }

    #[test]
    fn rejects_wrong_shape() {
        assert!(parse_questions(r#"{"quiz": "nope"}"#).is_err());
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        let s = "héllo wörld";
        let t = truncate_chars(s, 6);
        assert_eq!(t, "héllo ");
        assert_eq!(truncate_chars("short", 100), "short");
    }

    #[test]
    fn extract_rejects_garbage_bytes() {
        assert!(extract_pdf_text(b"definitely not a pdf").is_err());
    }
}
