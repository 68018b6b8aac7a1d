use bytes::Bytes;
use futures::TryStreamExt;
use futures::stream::{BoxStream, StreamExt};
use reqwest::Client;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::ChatError;
use crate::providers::{BuiltRequest, http_errors};
use crate::stream::ChatStream;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }
}

/// The byte source a [`ChatStream`] pulls from once the HTTP response is open.
pub type ResponseBytes = BoxStream<'static, Result<Bytes, ChatError>>;

/// Sends one prompt and waits for the complete reply.
pub async fn chat(client: &Client, cfg: &Config, prompt: &str) -> Result<String, ChatError> {
    let request = cfg.provider.build_request(cfg, prompt, false)?;
    let response = send(client, cfg, &request).await?;
    let status = response.status().as_u16();

    let body = response
        .text()
        .await
        .map_err(|err| http_errors::request_error(err, &request.url, cfg.timeout_secs))?;
    debug!(
        provider = cfg.provider.as_str(),
        status,
        body_len = body.len(),
        "received chat response"
    );

    cfg.provider.parse_complete(status, &body)
}

/// Sends one prompt and returns the reply as a pull sequence of text chunks.
/// Pre-stream HTTP errors are classified through the provider's error
/// envelope before any chunk is surfaced.
pub async fn chat_stream(
    client: &Client,
    cfg: &Config,
    prompt: &str,
) -> Result<ChatStream<ResponseBytes>, ChatError> {
    let request = cfg.provider.build_request(cfg, prompt, true)?;
    let response = send(client, cfg, &request).await?;
    let status = response.status().as_u16();

    if status != 200 {
        let body = response.text().await.unwrap_or_default();
        warn!(
            provider = cfg.provider.as_str(),
            status, "stream request rejected before any chunk arrived"
        );
        return Err(cfg.provider.parse_error(status, &body));
    }

    let url = request.url.clone();
    let timeout_secs = cfg.timeout_secs;
    let source = response
        .bytes_stream()
        .map_err(move |err| http_errors::request_error(err, &url, timeout_secs))
        .boxed();

    Ok(ChatStream::new(cfg.provider, source))
}

async fn send(
    client: &Client,
    cfg: &Config,
    request: &BuiltRequest,
) -> Result<reqwest::Response, ChatError> {
    debug!(
        url = %request.url,
        provider = cfg.provider.as_str(),
        model = %cfg.model,
        body_len = request.body.len(),
        "sending chat request"
    );

    let mut builder = client.post(&request.url).body(request.body.clone());
    for (name, value) in &request.headers {
        builder = builder.header(*name, value.as_str());
    }

    builder.send().await.map_err(|err| {
        warn!(url = %request.url, error = %err, "chat request failed");
        http_errors::request_error(err, &request.url, cfg.timeout_secs)
    })
}
