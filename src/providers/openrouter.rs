//! OpenRouter: the hosted aggregator. Speaks the chat-completions dialect
//! over SSE and is the only provider that authenticates.

use super::{BuiltRequest, chat_completions};
use crate::config::Config;
use crate::error::ChatError;
use crate::model::Message;

const CHAT_PATH: &str = "/api/v1/chat/completions";

// Attribution headers OpenRouter uses to credit the calling app.
const REFERRER: &str = "https://github.com/confab-cli/confab";
const TITLE: &str = "confab";

fn chat_url(base_url: &str) -> String {
    format!("{}{}", base_url.trim_end_matches('/'), CHAT_PATH)
}

pub(crate) fn build_request(
    cfg: &Config,
    prompt: &str,
    stream: bool,
) -> Result<BuiltRequest, ChatError> {
    let body = chat_completions::request_body(&cfg.model, &[Message::user(prompt)], stream)?;

    let mut headers = vec![
        ("Content-Type", "application/json".to_string()),
        ("User-Agent", super::USER_AGENT.to_string()),
        ("HTTP-Referer", REFERRER.to_string()),
        ("X-Title", TITLE.to_string()),
    ];
    if let Some(key) = &cfg.api_key {
        headers.push(("Authorization", format!("Bearer {key}")));
    }

    Ok(BuiltRequest {
        url: chat_url(&cfg.base_url),
        headers,
        body,
    })
}
