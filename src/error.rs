use thiserror::Error;

/// Failure modes of one chat invocation. Exactly one of these (or a
/// successful reply) is produced per request; nothing is retried internally.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("prompt is empty")]
    EmptyInput,

    #[error("failed to encode request body: {0}")]
    RequestEncode(#[source] serde_json::Error),

    #[error("{message}")]
    Transport { message: String },

    #[error(
        "model request timed out after {timeout_secs}s while calling '{url}'; \
         increase MODEL_TIMEOUT_SECS or check model responsiveness"
    )]
    Timeout { url: String, timeout_secs: u64 },

    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("API error ({}): {message}", .kind.as_deref().unwrap_or("unknown"))]
    Api {
        /// HTTP status for pre-stream errors; `None` for errors reported
        /// in-band inside an already-open stream.
        status: Option<u16>,
        kind: Option<String>,
        message: String,
    },

    #[error("failed to decode model response: {0}")]
    MalformedResponse(#[source] serde_json::Error),

    #[error("no choices returned by the API")]
    EmptyResponse,
}
