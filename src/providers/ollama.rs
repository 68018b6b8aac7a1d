//! Ollama: a local server with its own native format. Responses arrive as a
//! single `{message:{content}}` envelope, or as newline-delimited JSON when
//! streaming, with a `done` flag instead of a sentinel frame.

use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use super::{BuiltRequest, FrameEvent};
use crate::config::Config;
use crate::error::ChatError;
use crate::model::MessageRole;

fn chat_url(base_url: &str) -> String {
    format!("{}/api/chat", base_url.trim_end_matches('/'))
}

#[derive(Debug, Default, Deserialize)]
struct NativeMessage {
    #[serde(default)]
    content: String,
}

#[derive(Debug, Deserialize)]
struct NativeEnvelope {
    #[serde(default)]
    message: NativeMessage,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    error: Option<String>,
}

pub(crate) fn build_request(
    cfg: &Config,
    prompt: &str,
    stream: bool,
) -> Result<BuiltRequest, ChatError> {
    // Ollama tolerates extra fields, so the body stays an untyped map.
    let body = json!({
        "model": cfg.model,
        "messages": [{ "role": MessageRole::User.as_str(), "content": prompt }],
        "stream": stream,
    });

    Ok(BuiltRequest {
        url: chat_url(&cfg.base_url),
        headers: vec![
            ("Content-Type", "application/json".to_string()),
            ("User-Agent", super::USER_AGENT.to_string()),
        ],
        body: serde_json::to_string(&body).map_err(ChatError::RequestEncode)?,
    })
}

pub(crate) fn parse_success(status: u16, body: &str) -> Result<String, ChatError> {
    let envelope: NativeEnvelope =
        serde_json::from_str(body).map_err(ChatError::MalformedResponse)?;

    if let Some(message) = envelope.error.filter(|message| !message.is_empty()) {
        return Err(ChatError::Api {
            status: Some(status),
            kind: None,
            message,
        });
    }

    Ok(envelope.message.content)
}

pub(crate) fn parse_error(status: u16, body: &str) -> ChatError {
    if let Ok(envelope) = serde_json::from_str::<NativeEnvelope>(body)
        && let Some(message) = envelope.error.filter(|message| !message.is_empty())
    {
        return ChatError::Api {
            status: Some(status),
            kind: None,
            message,
        };
    }

    ChatError::Http {
        status,
        body: super::body_snippet(body),
    }
}

/// Decodes one line of the newline-delimited JSON stream. Every non-empty
/// line is expected to be one envelope; undecodable lines are skipped.
pub(crate) fn decode_stream_line(line: &str) -> FrameEvent {
    if line.trim().is_empty() {
        return FrameEvent::Ignored;
    }

    let envelope: NativeEnvelope = match serde_json::from_str(line) {
        Ok(envelope) => envelope,
        Err(err) => {
            debug!(error = %err, "skipping undecodable stream line");
            return FrameEvent::Ignored;
        }
    };

    if let Some(message) = envelope.error.filter(|message| !message.is_empty()) {
        return FrameEvent::Error {
            kind: None,
            message,
        };
    }

    let text = Some(envelope.message.content).filter(|content| !content.is_empty());
    FrameEvent::Chunk {
        text,
        finish: envelope.done,
    }
}
