//! OpenRouter provider implementation using the Responses API.
//!
//! This module uses OpenAI Responses API terminology:
//! - "input" (array of messages, not "context")
//! - "role" (not "source")
//! - SSE events: response.output_text.delta, response.completed

use std::time::Duration;

use async_trait::async_trait;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::Sender;

use super::{LineBuffer, build_client, ensure_success, sse_data};
use crate::inference::{
    CompletionProvider, CompletionRequest, Context, ProviderError, Source, StreamChunk,
};

pub const DEFAULT_OPENROUTER_BASE_URL: &str = "https://openrouter.ai/api/v1";

// ============================================================================
// OpenRouter Responses API Types
// ============================================================================

/// Role in an input message (OpenAI terminology)
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "lowercase")]
enum Role {
    System,
    User,
    Assistant,
}

#[derive(Serialize, Debug, Clone)]
#[serde(tag = "type", rename = "message")]
struct InputMessage {
    role: Role,
    content: String,
}

/// The request body for the Responses API
#[derive(Serialize, Debug)]
struct ResponsesRequest {
    model: String,
    input: Vec<InputMessage>,
    stream: bool,
}

/// OpenRouter embeds the event type inside the JSON, not in SSE `event:` lines.
#[derive(Deserialize, Debug)]
struct SseEvent {
    #[serde(rename = "type")]
    event_type: String,
    #[serde(default)]
    delta: String,
    #[serde(default)]
    error: Option<serde_json::Value>,
}

/// What the stream loop should do after an event.
#[derive(Debug, PartialEq)]
enum Step {
    Emit(String),
    Done,
    Fail(String),
    Skip,
}

// ============================================================================
// Translation Layer
// ============================================================================

fn context_to_input(context: &Context) -> Vec<InputMessage> {
    context
        .items
        .iter()
        .map(|seg| InputMessage {
            role: match seg.source {
                Source::Directive => Role::System,
                Source::User => Role::User,
                Source::Model => Role::Assistant,
            },
            content: seg.content.clone(),
        })
        .collect()
}

fn interpret(data: &str) -> Step {
    if data == "[DONE]" {
        return Step::Done;
    }
    let event: SseEvent = match serde_json::from_str(data) {
        Ok(event) => event,
        Err(e) => {
            debug!("Skipping unparseable SSE data ({e}): {data}");
            return Step::Skip;
        }
    };
    match event.event_type.as_str() {
        "response.output_text.delta" if !event.delta.is_empty() => Step::Emit(event.delta),
        "response.completed" => Step::Done,
        "response.failed" | "error" => Step::Fail(
            event
                .error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "response failed".to_string()),
        ),
        other => {
            debug!("Ignoring event type '{other}'");
            Step::Skip
        }
    }
}

// ============================================================================
// Provider Implementation
// ============================================================================

/// OpenRouter API provider using Responses API
pub struct OpenRouterProvider {
    api_key: String,
    base_url: String,
    client: reqwest::Client,
}

impl OpenRouterProvider {
    /// Creates a new OpenRouter provider.
    ///
    /// # Arguments
    /// * `api_key` - OpenRouter API key
    /// * `base_url` - Optional custom base URL (defaults to OpenRouter's API)
    /// * `timeout` - Optional whole-request timeout
    pub fn new(api_key: String, base_url: Option<String>, timeout: Option<Duration>) -> Self {
        Self {
            api_key,
            base_url: base_url.unwrap_or_else(|| DEFAULT_OPENROUTER_BASE_URL.to_string()),
            client: build_client(timeout),
        }
    }

    async fn handle(&self, data: &str, sender: &Sender<StreamChunk>) -> Result<bool, ProviderError> {
        match interpret(data) {
            Step::Emit(delta) => {
                if sender.send(StreamChunk::Content(delta)).await.is_err() {
                    warn!("Content chunk send failed: receiver dropped");
                    return Err(ProviderError::ChannelClosed);
                }
                Ok(false)
            }
            Step::Done => Ok(true),
            Step::Fail(message) => Err(ProviderError::Api {
                status: 200,
                message,
            }),
            Step::Skip => Ok(false),
        }
    }
}

#[async_trait]
impl CompletionProvider for OpenRouterProvider {
    fn name(&self) -> &str {
        "openrouter"
    }

    async fn stream_completion(
        &self,
        request: CompletionRequest<'_>,
        sender: Sender<StreamChunk>,
    ) -> Result<(), ProviderError> {
        let body = ResponsesRequest {
            model: request.model.to_string(),
            input: context_to_input(request.context),
            stream: true,
        };

        info!(
            "OpenRouter Responses API request: model={}, input_count={}",
            request.model,
            body.input.len()
        );

        let response = self
            .client
            .post(format!("{}/responses", self.base_url.trim_end_matches('/')))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        debug!("OpenRouter response status: {}", response.status());
        let mut response = ensure_success("OpenRouter", response).await?;

        let mut lines = LineBuffer::default();
        let mut done = false;

        while !done
            && let Some(chunk) = response
                .chunk()
                .await
                .map_err(|e| ProviderError::Network(e.to_string()))?
        {
            lines.push(&chunk);
            while let Some(line) = lines.next_line() {
                if let Some(data) = sse_data(&line)
                    && self.handle(data, &sender).await?
                {
                    done = true;
                    break;
                }
            }
        }
        if !done
            && let Some(line) = lines.finish()
            && let Some(data) = sse_data(&line)
        {
            self.handle(data, &sender).await?;
        }

        info!("OpenRouter stream complete");
        sender
            .send(StreamChunk::Completed)
            .await
            .map_err(|_| ProviderError::ChannelClosed)
    }
}
