//! HTTP streaming providers.
//!
//! Both backends speak Server-Sent Events over a chunked HTTP body, so the
//! line buffering and error-status handling live here.

mod gemini;
mod openrouter;

pub use gemini::{DEFAULT_GEMINI_BASE_URL, GeminiProvider};
pub use openrouter::{DEFAULT_OPENROUTER_BASE_URL, OpenRouterProvider};

use std::time::Duration;

use log::warn;

use crate::inference::ProviderError;

/// Builds the shared HTTP client. `timeout` bounds the whole request,
/// streaming body included.
fn build_client(timeout: Option<Duration>) -> reqwest::Client {
    let mut builder = reqwest::Client::builder();
    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }
    builder.build().unwrap_or_else(|e| {
        warn!("Failed to build HTTP client ({e}), falling back to defaults");
        reqwest::Client::new()
    })
}

/// Turns a non-2xx response into `ProviderError::Api` with the body as message.
async fn ensure_success(
    provider: &str,
    response: reqwest::Response,
) -> Result<reqwest::Response, ProviderError> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status().as_u16();
    let message = response
        .text()
        .await
        .unwrap_or_else(|_| "unknown error".to_string());
    warn!("{provider} API error: {status} - {message}");
    Err(ProviderError::Api { status, message })
}

/// Accumulates raw body chunks and hands back complete lines.
///
/// SSE events may be split across TCP chunks at any byte, including inside a
/// multi-byte character, so bytes are buffered until a newline arrives.
#[derive(Default)]
struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    fn push(&mut self, bytes: &[u8]) {
        self.pending.extend_from_slice(bytes);
    }

    /// Next complete line with the trailing `\r\n`/`\n` removed.
    fn next_line(&mut self) -> Option<String> {
        let pos = self.pending.iter().position(|&b| b == b'\n')?;
        let line: Vec<u8> = self.pending.drain(..=pos).collect();
        let text = String::from_utf8_lossy(&line);
        Some(text.trim_end_matches(['\r', '\n']).to_string())
    }

    /// Whatever is left once the body ends without a final newline.
    fn finish(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let text = String::from_utf8_lossy(&self.pending).trim().to_string();
        self.pending.clear();
        (!text.is_empty()).then_some(text)
    }
}

/// Payload of an SSE `data:` line, if this is one.
fn sse_data(line: &str) -> Option<&str> {
    line.strip_prefix("data:").map(str::trim_start)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_buffer_joins_split_lines() {
        let mut buf = LineBuffer::default();
        buf.push(b"data: {\"a\"");
        assert_eq!(buf.next_line(), None);
        buf.push(b":1}\r\ndata: x\n");
        assert_eq!(buf.next_line().as_deref(), Some("data: {\"a\":1}"));
        assert_eq!(buf.next_line().as_deref(), Some("data: x"));
        assert_eq!(buf.next_line(), None);
    }

    #[test]
    fn line_buffer_keeps_multibyte_chars_split_across_chunks() {
        let text = "data: olá\n".as_bytes();
        let split = text.iter().position(|&b| b == 0xC3).unwrap() + 1;
        let mut buf = LineBuffer::default();
        buf.push(&text[..split]);
        buf.push(&text[split..]);
        assert_eq!(buf.next_line().as_deref(), Some("data: olá"));
    }

    #[test]
    fn line_buffer_finish_returns_unterminated_tail() {
        let mut buf = LineBuffer::default();
        buf.push(b"data: tail");
        assert_eq!(buf.next_line(), None);
        assert_eq!(buf.finish().as_deref(), Some("data: tail"));
        assert_eq!(buf.finish(), None);
    }

    #[test]
    fn sse_data_strips_prefix() {
        assert_eq!(sse_data("data: {}"), Some("{}"));
        assert_eq!(sse_data("data:{}"), Some("{}"));
        assert_eq!(sse_data("event: x"), None);
    }
}
