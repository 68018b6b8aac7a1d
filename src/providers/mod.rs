pub mod chat_completions;
pub mod http_errors;
pub mod lmstudio;
pub mod ollama;
pub mod openrouter;

use crate::config::Config;
use crate::error::ChatError;

pub(crate) const USER_AGENT: &str = concat!("confab/", env!("CARGO_PKG_VERSION"));

const ERROR_BODY_SNIPPET_CHARS: usize = 500;

/// The closed set of chat backends. Each variant answers the same capability
/// set: build a request, interpret a complete response, interpret one
/// streamed line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    OpenRouter,
    Ollama,
    LmStudio,
}

/// A fully prepared HTTP request: target URL, header pairs, and the
/// serialized JSON body. Producing one involves no I/O.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltRequest {
    pub url: String,
    pub headers: Vec<(&'static str, String)>,
    pub body: String,
}

/// Outcome of decoding one line of a live response stream.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum FrameEvent {
    /// Non-data line, undecodable frame, or frame with nothing to say.
    Ignored,
    /// A decoded frame; `finish` marks the sequence as complete after the
    /// carried text (if any) has been surfaced.
    Chunk { text: Option<String>, finish: bool },
    /// End-of-stream sentinel.
    Done,
    /// In-band provider error; aborts the stream.
    Error {
        kind: Option<String>,
        message: String,
    },
}

impl Provider {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "openrouter" => Some(Self::OpenRouter),
            "ollama" => Some(Self::Ollama),
            "lmstudio" => Some(Self::LmStudio),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenRouter => "openrouter",
            Self::Ollama => "ollama",
            Self::LmStudio => "lmstudio",
        }
    }

    pub fn default_base_url(&self) -> &'static str {
        match self {
            Self::OpenRouter => "https://openrouter.ai",
            Self::Ollama => "http://localhost:11434",
            Self::LmStudio => "http://localhost:1234",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            Self::OpenRouter => "openai/gpt-oss-20b:free",
            Self::Ollama => "llama3.2",
            Self::LmStudio => "local-model",
        }
    }

    pub fn requires_api_key(&self) -> bool {
        matches!(self, Self::OpenRouter)
    }

    /// Builds the provider-specific request for one prompt. The single
    /// validation performed here is rejecting an empty prompt; everything
    /// else (key presence, model resolution) is settled at config load.
    pub fn build_request(
        &self,
        cfg: &Config,
        prompt: &str,
        stream: bool,
    ) -> Result<BuiltRequest, ChatError> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(ChatError::EmptyInput);
        }

        match self {
            Self::OpenRouter => openrouter::build_request(cfg, prompt, stream),
            Self::Ollama => ollama::build_request(cfg, prompt, stream),
            Self::LmStudio => lmstudio::build_request(cfg, prompt, stream),
        }
    }

    /// Interprets a complete (non-streamed) response body.
    pub fn parse_complete(&self, status: u16, body: &str) -> Result<String, ChatError> {
        if status != 200 {
            return Err(self.parse_error(status, body));
        }

        match self {
            Self::OpenRouter | Self::LmStudio => chat_completions::parse_success(status, body),
            Self::Ollama => ollama::parse_success(status, body),
        }
    }

    /// Classifies a non-200 response: a decodable error envelope with a
    /// non-empty message becomes an API error, anything else an HTTP error.
    pub(crate) fn parse_error(&self, status: u16, body: &str) -> ChatError {
        match self {
            Self::OpenRouter | Self::LmStudio => chat_completions::parse_error(status, body),
            Self::Ollama => ollama::parse_error(status, body),
        }
    }

    pub(crate) fn decode_stream_line(&self, line: &str) -> FrameEvent {
        match self {
            Self::OpenRouter | Self::LmStudio => chat_completions::decode_stream_line(line),
            Self::Ollama => ollama::decode_stream_line(line),
        }
    }
}

/// Truncates an error body for display so a giant HTML error page does not
/// flood the terminal.
pub(crate) fn body_snippet(body: &str) -> String {
    let trimmed = body.trim();
    match trimmed.char_indices().nth(ERROR_BODY_SNIPPET_CHARS) {
        Some((idx, _)) => format!("{}...", &trimmed[..idx]),
        None => trimmed.to_string(),
    }
}
