use crate::error::GatewayError;
use crate::models::{Notices, QuizOutcome, QuizQuestion};
use crate::services::gemini::{ContentBackend, GenerateContentRequest};
use crate::utils::truncate_chars;
use serde_json::{Value, json};
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Most characters of book text embedded in a summary prompt.
pub const SUMMARY_INPUT_CHARS: usize = 8000;
/// Most characters of chapter text embedded in a quiz prompt.
pub const QUIZ_INPUT_CHARS: usize = 2000;

pub const MIN_SUMMARY_PERCENT: u8 = 10;
pub const MAX_SUMMARY_PERCENT: u8 = 80;
pub const DEFAULT_SUMMARY_PERCENT: u8 = 30;

pub const EMPTY_QUIZ_INPUT: &str = "Please provide text to generate a quiz.";

/// What a successful call produced.
#[derive(Debug, Clone, PartialEq)]
pub enum Generated {
    /// The reply text, untouched.
    Text(String),
    /// The reply parsed as JSON because a response schema was supplied.
    Structured(Value),
}

/// Clamp a requested summary length to the supported range.
pub fn clamp_summary_percent(percent: u8) -> u8 {
    percent.clamp(MIN_SUMMARY_PERCENT, MAX_SUMMARY_PERCENT)
}

pub fn summary_prompt(text: &str, length_percent: u8) -> String {
    format!(
        "Please summarize the following book text in a concise manner, aiming for about {}% of the original length. Focus on the main plot, key characters, and significant events:\n\n{}",
        clamp_summary_percent(length_percent),
        truncate_chars(text, SUMMARY_INPUT_CHARS)
    )
}

pub fn quiz_prompt(text: &str) -> String {
    format!(
        "Generate one multiple-choice question from the following text.\nThe question should have four options, and one correct answer.\nThe correct answer must be one of the provided options.\n\nText:\n{}",
        truncate_chars(text, QUIZ_INPUT_CHARS)
    )
}

/// Response schema for a list of quiz questions.
pub fn quiz_schema() -> Value {
    json!({
        "type": "ARRAY",
        "items": {
            "type": "OBJECT",
            "properties": {
                "question": { "type": "STRING" },
                "options": {
                    "type": "ARRAY",
                    "items": { "type": "STRING" }
                },
                "correct_answer": { "type": "STRING" }
            },
            "required": ["question", "options", "correct_answer"]
        }
    })
}

/// Sort a structured quiz reply into an outcome.
///
/// Arrays yield the well-formed questions they contain; an object with an
/// `error` string is passed through verbatim; anything else is unusable.
pub fn interpret_quiz_reply(reply: Value) -> QuizOutcome {
    match reply {
        Value::Array(items) => {
            let total = items.len();
            let questions: Vec<QuizQuestion> = items
                .into_iter()
                .filter_map(|item| serde_json::from_value::<QuizQuestion>(item).ok())
                .filter(QuizQuestion::is_well_formed)
                .collect();

            if questions.len() < total {
                tracing::warn!(
                    "Dropped {} of {} quiz items that did not have four options including the answer",
                    total - questions.len(),
                    total
                );
            }

            if questions.is_empty() {
                QuizOutcome::Unusable
            } else {
                QuizOutcome::Questions(questions)
            }
        }
        Value::Object(map) => match map.get("error").and_then(Value::as_str) {
            Some(error) => QuizOutcome::Rejected {
                error: error.to_string(),
            },
            None => QuizOutcome::Unusable,
        },
        _ => QuizOutcome::Unusable,
    }
}

/// The single entry point to the generative model.
#[derive(Clone)]
pub struct AiGateway {
    backend: Arc<dyn ContentBackend>,
}

impl AiGateway {
    pub fn new(backend: Arc<dyn ContentBackend>) -> Self {
        AiGateway { backend }
    }

    /// Run one request on its own task. The handle resolves to the parsed
    /// reply or the reason there is none.
    pub fn spawn_generate(
        &self,
        prompt: String,
        schema: Option<Value>,
    ) -> JoinHandle<Result<Generated, GatewayError>> {
        let backend = Arc::clone(&self.backend);
        tokio::spawn(async move {
            let request = GenerateContentRequest::single_turn(&prompt, schema.as_ref());
            let response = backend.generate_content(request).await?;
            let text = response.reply_text()?;

            if schema.is_some() {
                serde_json::from_str(text)
                    .map(Generated::Structured)
                    .map_err(|e| GatewayError::InvalidStructuredReply(e.to_string()))
            } else {
                Ok(Generated::Text(text.to_string()))
            }
        })
    }

    /// Send `prompt` to the model and wait for the reply.
    ///
    /// Failures are logged and recorded as exactly one error notice; the
    /// caller only sees `None`.
    pub async fn generate(
        &self,
        prompt: &str,
        schema: Option<&Value>,
        notices: &mut Notices,
    ) -> Option<Generated> {
        let outcome = match self
            .spawn_generate(prompt.to_string(), schema.cloned())
            .await
        {
            Ok(result) => result,
            Err(join_err) => Err(GatewayError::TaskFailed(join_err.to_string())),
        };

        match outcome {
            Ok(generated) => Some(generated),
            Err(e) => {
                tracing::error!("AI request failed: {}", e);
                notices.error(e.user_message());
                None
            }
        }
    }

    /// Summarize `text` in roughly `length_percent` percent of its length.
    pub async fn summarize(
        &self,
        text: &str,
        length_percent: u8,
        notices: &mut Notices,
    ) -> Option<String> {
        let prompt = summary_prompt(text, length_percent);
        tracing::info!(
            "Generating summary at {}% from {} characters",
            clamp_summary_percent(length_percent),
            text.chars().count().min(SUMMARY_INPUT_CHARS)
        );

        match self.generate(&prompt, None, notices).await? {
            Generated::Text(summary) => Some(summary),
            // no schema was sent
            Generated::Structured(_) => None,
        }
    }

    /// Ask the model for multiple-choice questions about `text`.
    pub async fn generate_quiz(&self, text: &str, notices: &mut Notices) -> QuizOutcome {
        if text.trim().is_empty() {
            return QuizOutcome::Rejected {
                error: EMPTY_QUIZ_INPUT.to_string(),
            };
        }

        let prompt = quiz_prompt(text);
        let schema = quiz_schema();
        tracing::info!("Generating quiz question");

        match self.generate(&prompt, Some(&schema), notices).await {
            Some(Generated::Structured(reply)) => interpret_quiz_reply(reply),
            Some(Generated::Text(_)) => QuizOutcome::Unusable,
            None => QuizOutcome::Failed,
        }
    }
}
