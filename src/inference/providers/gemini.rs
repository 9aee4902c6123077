//! Google Gemini provider using `streamGenerateContent` with SSE output.
//!
//! Gemini terminology differs from ours:
//! - the directive travels as `systemInstruction`, not as a message
//! - model turns use the role `"model"`
//! - each SSE `data:` line is a full `GenerateContentResponse` holding a text delta

use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::Sender;

use super::{LineBuffer, build_client, ensure_success, sse_data};
use crate::inference::{
    CompletionProvider, CompletionRequest, Context, ProviderError, Source, StreamChunk,
};

pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

// ============================================================================
// Gemini API Types
// ============================================================================

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    contents: Vec<Content>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
    #[serde(default)]
    finish_reason: Option<String>,
}

// ============================================================================
// Translation Layer
// ============================================================================

/// Splits our context into Gemini's `systemInstruction` + `contents`.
fn context_to_request(context: &Context) -> GenerateRequest {
    let system_instruction = context.directive().map(|text| Content {
        role: None,
        parts: vec![Part {
            text: text.to_string(),
        }],
    });

    let contents = context
        .turns()
        .map(|seg| Content {
            role: Some(
                match seg.source {
                    Source::Model => "model",
                    Source::User | Source::Directive => "user",
                }
                .to_string(),
            ),
            parts: vec![Part {
                text: seg.content.clone(),
            }],
        })
        .collect();

    GenerateRequest {
        system_instruction,
        contents,
    }
}

/// Concatenated text of the first candidate in one streamed response.
fn response_text(response: &GenerateResponse) -> String {
    response
        .candidates
        .first()
        .and_then(|c| c.content.as_ref())
        .map(|content| content.parts.iter().map(|p| p.text.as_str()).collect())
        .unwrap_or_default()
}

// ============================================================================
// Provider Implementation
// ============================================================================

pub struct GeminiProvider {
    api_key: String,
    base_url: String,
    client: reqwest::Client,
}

impl GeminiProvider {
    /// Creates a new Gemini provider.
    ///
    /// # Arguments
    /// * `api_key` - Google AI Studio API key
    /// * `base_url` - Optional custom base URL (defaults to the public v1beta endpoint)
    /// * `timeout` - Optional whole-request timeout
    pub fn new(api_key: String, base_url: Option<String>, timeout: Option<Duration>) -> Self {
        Self {
            api_key,
            base_url: base_url.unwrap_or_else(|| DEFAULT_GEMINI_BASE_URL.to_string()),
            client: build_client(timeout),
        }
    }

    fn endpoint(&self, model: &str) -> String {
        format!(
            "{}/models/{}:streamGenerateContent?alt=sse",
            self.base_url.trim_end_matches('/'),
            model
        )
    }

    /// Parses one `data:` payload and forwards its text.
    async fn forward(
        &self,
        data: &str,
        sender: &Sender<StreamChunk>,
    ) -> Result<(), ProviderError> {
        let response: GenerateResponse = serde_json::from_str(data)
            .map_err(|e| ProviderError::Parse(format!("bad stream event: {e}")))?;

        if let Some(reason) = response
            .candidates
            .first()
            .and_then(|c| c.finish_reason.as_deref())
        {
            debug!("Gemini finish reason: {reason}");
        }

        let text = response_text(&response);
        if text.is_empty() {
            return Ok(());
        }
        sender
            .send(StreamChunk::Content(text))
            .await
            .map_err(|_| {
                warn!("Content chunk send failed: receiver dropped");
                ProviderError::ChannelClosed
            })
    }
}

#[async_trait]
impl CompletionProvider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn stream_completion(
        &self,
        request: CompletionRequest<'_>,
        sender: Sender<StreamChunk>,
    ) -> Result<(), ProviderError> {
        let body = context_to_request(request.context);

        info!(
            "Gemini request: model={}, contents={}",
            request.model,
            body.contents.len()
        );

        let response = self
            .client
            .post(self.endpoint(request.model))
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        debug!("Gemini response status: {}", response.status());
        let response = ensure_success("Gemini", response).await?;

        let mut lines = LineBuffer::default();
        let mut stream = response.bytes_stream();
        let mut events = 0usize;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| ProviderError::Network(e.to_string()))?;
            lines.push(&chunk);
            while let Some(line) = lines.next_line() {
                if let Some(data) = sse_data(&line) {
                    events += 1;
                    self.forward(data, &sender).await?;
                }
            }
        }
        if let Some(line) = lines.finish()
            && let Some(data) = sse_data(&line)
        {
            events += 1;
            self.forward(data, &sender).await?;
        }

        info!("Gemini stream complete: {events} events");
        sender
            .send(StreamChunk::Completed)
            .await
            .map_err(|_| ProviderError::ChannelClosed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_moves_directive_into_system_instruction() {
        let mut ctx = Context::new("You are Water IA.");
        ctx.add_user_message("make a kill brick".to_string());
        ctx.append_to_last_model_message("```lua\n```");

        let req = context_to_request(&ctx);
        let json = serde_json::to_value(&req).unwrap();

        assert_eq!(
            json["systemInstruction"]["parts"][0]["text"],
            "You are Water IA."
        );
        assert_eq!(json["contents"].as_array().unwrap().len(), 2);
        assert_eq!(json["contents"][0]["role"], "user");
        assert_eq!(json["contents"][1]["role"], "model");
        assert!(json["systemInstruction"].get("role").is_none());
    }

    #[test]
    fn response_text_joins_parts_of_first_candidate() {
        let data = r#"{"candidates":[{"content":{"role":"model","parts":[{"text":"Hel"},{"text":"lo"}]}}]}"#;
        let response: GenerateResponse = serde_json::from_str(data).unwrap();
        assert_eq!(response_text(&response), "Hello");
    }

    #[test]
    fn response_text_tolerates_missing_content() {
        let data = r#"{"candidates":[{"finishReason":"STOP"}]}"#;
        let response: GenerateResponse = serde_json::from_str(data).unwrap();
        assert_eq!(response_text(&response), "");
    }

    #[test]
    fn endpoint_includes_model_and_sse_flag() {
        let provider = GeminiProvider::new("k".into(), Some("http://x/v1beta/".into()), None);
        assert_eq!(
            provider.endpoint("gemini-2.5-pro"),
            "http://x/v1beta/models/gemini-2.5-pro:streamGenerateContent?alt=sse"
        );
    }
}
