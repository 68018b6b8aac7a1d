//! Wire format shared by the OpenAI-style providers (OpenRouter, LM Studio):
//! the `chat/completions` request body, the `choices` response envelope, and
//! the SSE `data: <json>` / `data: [DONE]` stream framing.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::FrameEvent;
use crate::error::ChatError;
use crate::model::Message;

const SSE_DATA_PREFIX: &str = "data: ";
const SSE_DONE_PAYLOAD: &str = "[DONE]";

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Default, Deserialize)]
struct ContentHolder {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    #[serde(default)]
    delta: ContentHolder,
    #[serde(default)]
    message: ContentHolder,
    #[serde(default)]
    finish_reason: Option<String>,
}

/// Response envelope, shared by complete responses and stream frames. The
/// `error` field can appear alone or, oddly, next to a 200 status.
#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    choices: Vec<Choice>,
    error: Option<ApiErrorBody>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    message: String,
    #[serde(rename = "type")]
    kind: Option<String>,
}

pub(crate) fn request_body(
    model: &str,
    messages: &[Message],
    stream: bool,
) -> Result<String, ChatError> {
    let request = ChatCompletionRequest {
        model,
        messages: messages
            .iter()
            .map(|msg| WireMessage {
                role: msg.role.as_str(),
                content: &msg.content,
            })
            .collect(),
        stream,
    };
    serde_json::to_string(&request).map_err(ChatError::RequestEncode)
}

/// Decodes a 200 response. Callers route non-200 statuses through
/// [`parse_error`] first.
pub(crate) fn parse_success(status: u16, body: &str) -> Result<String, ChatError> {
    let envelope: Envelope = serde_json::from_str(body).map_err(ChatError::MalformedResponse)?;

    if let Some(err) = envelope.error {
        return Err(ChatError::Api {
            status: Some(status),
            kind: err.kind,
            message: err.message,
        });
    }

    let Some(choice) = envelope.choices.into_iter().next() else {
        return Err(ChatError::EmptyResponse);
    };
    Ok(choice.message.content.unwrap_or_default())
}

pub(crate) fn parse_error(status: u16, body: &str) -> ChatError {
    if let Ok(envelope) = serde_json::from_str::<Envelope>(body)
        && let Some(err) = envelope.error
        && !err.message.is_empty()
    {
        return ChatError::Api {
            status: Some(status),
            kind: err.kind,
            message: err.message,
        };
    }

    ChatError::Http {
        status,
        body: super::body_snippet(body),
    }
}

/// Decodes one SSE line. Lines without the `data: ` prefix carry no payload;
/// an undecodable payload is skipped rather than aborting the stream.
pub(crate) fn decode_stream_line(line: &str) -> FrameEvent {
    let Some(payload) = line.strip_prefix(SSE_DATA_PREFIX) else {
        return FrameEvent::Ignored;
    };
    if payload == SSE_DONE_PAYLOAD {
        return FrameEvent::Done;
    }

    let envelope: Envelope = match serde_json::from_str(payload) {
        Ok(envelope) => envelope,
        Err(err) => {
            debug!(error = %err, "skipping undecodable stream frame");
            return FrameEvent::Ignored;
        }
    };

    if let Some(err) = envelope.error {
        return FrameEvent::Error {
            kind: err.kind,
            message: err.message,
        };
    }

    let Some(choice) = envelope.choices.into_iter().next() else {
        return FrameEvent::Ignored;
    };

    // Incremental frames carry `delta`; some backends repeat the full text in
    // `message` on the terminal frame, which only matters if `delta` is empty.
    let text = choice
        .delta
        .content
        .filter(|content| !content.is_empty())
        .or_else(|| choice.message.content.filter(|content| !content.is_empty()));
    let finish = choice.finish_reason.is_some_and(|reason| !reason.is_empty());

    FrameEvent::Chunk { text, finish }
}
