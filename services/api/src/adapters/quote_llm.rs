//! services/api/src/adapters/quote_llm.rs
//!
//! This module contains the adapter for the motivational-text LLM.
//! It implements the `QuoteService` port from the `core` crate.

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
use study_tracker_core::ports::{PortError, PortResult, QuoteService};

const QUOTE_SYSTEM_PROMPT: &str = "You write for UPSC Civil Services aspirants. Reply with the requested text only, without a preamble.";

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `QuoteService` using an OpenAI-compatible LLM.
#[derive(Clone)]
pub struct OpenAiQuoteAdapter {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiQuoteAdapter {
    /// Creates a new `OpenAiQuoteAdapter`.
    pub fn new(client: Client<OpenAIConfig>, model: String) -> Self {
        Self { client, model }
    }

    async fn complete(&self, prompt: String, temperature: Option<f32>) -> PortResult<String> {
        let messages = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(QUOTE_SYSTEM_PROMPT)
                .build()
                .map_err(|e| PortError::Unexpected(e.to_string()))?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(prompt)
                .build()
                .map_err(|e| PortError::Unexpected(e.to_string()))?
                .into(),
        ];

        let mut request = CreateChatCompletionRequestArgs::default();
        request.model(&self.model).messages(messages).n(1);
        if let Some(temperature) = temperature {
            request.temperature(temperature);
        }
        let request = request
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e: OpenAIError| PortError::Unavailable(e.to_string()))?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|text| text.trim().to_string())
            .ok_or_else(|| {
                PortError::Unexpected("Quote LLM response contained no text content.".to_string())
            })
    }
}

fn quote_prompt(day: u32, task_titles: &[String]) -> String {
    format!(
        "I am a UPSC (Civil Services) aspirant on Day {} of a rigorous 75-day challenge. \
         My focus areas today are: {}. \
         Provide a powerful, prestigious, and deeply motivational quote or a short inspiring \
         paragraph (2-3 sentences) specifically for a future administrator. \
         Focus on discipline, the weight of responsibility, and the glory of the long haul. \
         Do not use generic cliches; make it sound like advice from a senior cabinet secretary \
         or a legendary IAS officer.",
        day,
        task_titles.join(", ")
    )
}

fn explain_prompt(topic: &str) -> String {
    format!(
        "Explain the UPSC relevance and core concepts of \"{}\" in bullet points for a quick revision.",
        topic
    )
}

//=========================================================================================
// `QuoteService` Trait Implementation
//=========================================================================================

#[async_trait]
impl QuoteService for OpenAiQuoteAdapter {
    async fn motivational_quote(&self, day: u32, task_titles: &[String]) -> PortResult<String> {
        self.complete(quote_prompt(day, task_titles), Some(0.8)).await
    }

    async fn explain_topic(&self, topic: &str) -> PortResult<String> {
        self.complete(explain_prompt(topic), None).await
    }
}
