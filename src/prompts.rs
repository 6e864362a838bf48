//! Prompts for LLM-based quiz generation.
//!
//! Keeping the prompt here rather than inline in the client means a wording
//! change touches exactly one place, and unit tests can inspect the text
//! without a live model.

/// System prompt for generating a multiple-choice quiz from document text.
///
/// The model must return a JSON object so the response can be parsed and
/// validated mechanically; anything that fails validation rejects the whole
/// generation.
pub const QUIZ_SYSTEM_PROMPT: &str = r#"You are a teacher. The user will give you the text of a PDF document. Generate a list of exactly four multiple choice questions based on its content. Each question must have exactly four possible answers, with exactly one of them correct.

Respond with a JSON object of this exact shape and nothing else:

{
  "questions": [
    {
      "question": "<the question text>",
      "options": ["<option 1>", "<option 2>", "<option 3>", "<option 4>"],
      "correctAnswer": "<the option that is correct, copied verbatim>"
    }
  ]
}

Do not wrap the JSON in code fences. Do not add commentary."#;

/// Build the user message carrying the extracted document text.
pub fn quiz_user_prompt(document_text: &str) -> String {
    format!(
        "Generate the quiz from the following document:\n\n\"\"\"\n{}\n\"\"\"",
        document_text
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{OPTIONS_PER_QUESTION, QUESTIONS_PER_QUIZ};

    #[test]
    fn prompt_pins_question_and_option_counts() {
        assert!(QUIZ_SYSTEM_PROMPT.contains("exactly four multiple choice questions"));
        assert!(QUIZ_SYSTEM_PROMPT.contains("exactly four possible answers"));
        assert_eq!(QUESTIONS_PER_QUIZ, 4);
        assert_eq!(OPTIONS_PER_QUESTION, 4);
    }

    #[test]
    fn user_prompt_embeds_the_document() {
        let p = quiz_user_prompt("cell biology basics");
        assert!(p.contains("cell biology basics"));
    }
}
