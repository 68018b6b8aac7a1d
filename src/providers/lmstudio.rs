//! LM Studio: a local OpenAI-compatible server. Same chat-completions wire
//! format as OpenRouter, but unauthenticated and served from localhost.

use super::{BuiltRequest, chat_completions};
use crate::config::Config;
use crate::error::ChatError;
use crate::model::Message;

const CHAT_PATH: &str = "/v1/chat/completions";

fn chat_url(base_url: &str) -> String {
    format!("{}{}", base_url.trim_end_matches('/'), CHAT_PATH)
}

pub(crate) fn build_request(
    cfg: &Config,
    prompt: &str,
    stream: bool,
) -> Result<BuiltRequest, ChatError> {
    let body = chat_completions::request_body(&cfg.model, &[Message::user(prompt)], stream)?;

    Ok(BuiltRequest {
        url: chat_url(&cfg.base_url),
        headers: vec![
            ("Content-Type", "application/json".to_string()),
            ("User-Agent", super::USER_AGENT.to_string()),
        ],
        body,
    })
}
