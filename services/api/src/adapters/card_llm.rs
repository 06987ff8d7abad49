//! services/api/src/adapters/card_llm.rs
//!
//! This module contains the adapter for the card-generating LLM.
//! It implements the `CardGenerationService` port from the `core` crate.

use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::chat::{
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use flashdeck_core::{
    domain::GeneratedCard,
    ports::{CardGenerationService, PortError, PortResult},
};
use serde::Deserialize;

const BLANK_MARKER: &str = "______";

const SYSTEM_INSTRUCTIONS: &str = "You are an expert teacher creating fill-in-the-blank \
flashcards. Given a passage, produce exactly five cards. Each 'question' is a sentence from \
the passage with a key term replaced by '______'. Each 'answer' is the missing term, nothing \
more. Respond with ONLY a JSON object of the form \
{\"flashcards\": [{\"question\": \"...\", \"answer\": \"...\"}]} and no other text.";

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `CardGenerationService` using an OpenAI-compatible LLM.
#[derive(Clone)]
pub struct OpenAiCardAdapter {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiCardAdapter {
    /// Creates a new `OpenAiCardAdapter`.
    pub fn new(client: Client<OpenAIConfig>, model: String) -> Self {
        Self { client, model }
    }
}

//=========================================================================================
// Response Payload Parsing
//=========================================================================================

#[derive(Deserialize)]
struct FlashcardListPayload {
    flashcards: Vec<FlashcardPayload>,
}

#[derive(Deserialize)]
struct FlashcardPayload {
    question: String,
    answer: String,
}

/// Parses the model's reply into card drafts, tolerating a markdown code
/// fence around the JSON body.
fn parse_drafts(raw: &str) -> Result<Vec<GeneratedCard>, serde_json::Error> {
    let trimmed = raw.trim();
    let body = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|s| s.strip_suffix("```"))
        .unwrap_or(trimmed);

    let payload: FlashcardListPayload = serde_json::from_str(body.trim())?;
    Ok(payload
        .flashcards
        .into_iter()
        .filter(|card| !card.question.trim().is_empty() && !card.answer.trim().is_empty())
        .map(|card| {
            let blank_count = count_blanks(&card.question);
            GeneratedCard {
                question: card.question,
                answer: card.answer,
                blank_count,
            }
        })
        .collect())
}

/// Counts blank markers in a question; a card always weighs at least 1.
fn count_blanks(question: &str) -> i32 {
    (question.matches(BLANK_MARKER).count() as i32).max(1)
}

//=========================================================================================
// `CardGenerationService` Trait Implementation
//=========================================================================================

#[async_trait]
impl CardGenerationService for OpenAiCardAdapter {
    /// Generates fill-in-the-blank drafts for a source passage.
    async fn generate_cards(
        &self,
        text: &str,
        keywords: Option<&str>,
    ) -> PortResult<Vec<GeneratedCard>> {
        let mut user_input = String::new();
        if let Some(keywords) = keywords.filter(|k| !k.trim().is_empty()) {
            user_input.push_str(&format!(
                "Prefer blanking out terms related to these keywords: {}. \
                 If a keyword does not appear in the text, use other important terms instead.\n\n",
                keywords
            ));
        }
        user_input.push_str(&format!("TEXT:\n{}", text));

        let messages = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(SYSTEM_INSTRUCTIONS)
                .build()
                .map_err(|e| PortError::Unexpected(e.to_string()))?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(user_input)
                .build()
                .map_err(|e| PortError::Unexpected(e.to_string()))?
                .into(),
        ];

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .temperature(0.2)
            .n(1)
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        // Call the API and manually map the error if it occurs, which respects the orphan rule.
        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e: OpenAIError| PortError::Unexpected(e.to_string()))?;

        // Extract the text content from the first choice in the response.
        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| {
                PortError::Unexpected(
                    "Card generation LLM response contained no text content.".to_string(),
                )
            })?;

        let drafts = parse_drafts(&content).map_err(|e| {
            PortError::Unexpected(format!("Card generation LLM returned invalid JSON: {}", e))
        })?;

        Ok(drafts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_json_payload() {
        let raw = r#"{"flashcards": [
            {"question": "The capital of France is ______.", "answer": "Paris"},
            {"question": "______ wrote ______.", "answer": "Shakespeare, Hamlet"}
        ]}"#;

        let drafts = parse_drafts(raw).unwrap();
        assert_eq!(drafts.len(), 2);
        assert_eq!(drafts[0].blank_count, 1);
        assert_eq!(drafts[1].blank_count, 2);
    }

    #[test]
    fn parses_fenced_json_payload() {
        let raw = "```json\n{\"flashcards\": [{\"question\": \"Water boils at ______ C.\", \"answer\": \"100\"}]}\n```";
        let drafts = parse_drafts(raw).unwrap();
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].answer, "100");
    }

    #[test]
    fn drops_empty_drafts() {
        let raw = r#"{"flashcards": [
            {"question": "", "answer": "Paris"},
            {"question": "Valid ______.", "answer": "  "},
            {"question": "Kept ______.", "answer": "term"}
        ]}"#;

        let drafts = parse_drafts(raw).unwrap();
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].answer, "term");
    }

    #[test]
    fn question_without_marker_still_weighs_one() {
        assert_eq!(count_blanks("no marker here"), 1);
    }

    #[test]
    fn invalid_json_is_an_error() {
        assert!(parse_drafts("the model rambled instead").is_err());
    }
}
