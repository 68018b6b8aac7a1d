//! Maps reqwest failures onto [`ChatError`] variants with actionable
//! messages. reqwest wraps the interesting io errors several layers deep, so
//! classification walks the full source chain.

use std::error::Error as StdError;
use std::io::ErrorKind;

use crate::error::ChatError;

fn error_chain_has_io_kind(err: &(dyn StdError + 'static), kind: ErrorKind, needle: &str) -> bool {
    let mut current: Option<&(dyn StdError + 'static)> = Some(err);
    while let Some(source) = current {
        if let Some(io_err) = source.downcast_ref::<std::io::Error>()
            && io_err.kind() == kind
        {
            return true;
        }

        if source.to_string().to_ascii_lowercase().contains(needle) {
            return true;
        }

        current = source.source();
    }

    false
}

fn is_timeout(err: &reqwest::Error) -> bool {
    err.is_timeout() || error_chain_has_io_kind(err, ErrorKind::TimedOut, "timed out")
}

fn is_connection_refused(err: &reqwest::Error) -> bool {
    error_chain_has_io_kind(err, ErrorKind::ConnectionRefused, "connection refused")
}

/// Classifies a failure from sending the request or reading its body.
pub(crate) fn request_error(err: reqwest::Error, api_url: &str, timeout_secs: u64) -> ChatError {
    if is_timeout(&err) {
        return ChatError::Timeout {
            url: api_url.to_string(),
            timeout_secs,
        };
    }

    if err.is_connect() {
        let message = if is_connection_refused(&err) {
            format!(
                "Connection refused by model API at '{api_url}'. \
                 Ensure the provider is running and MODEL_BASE_URL is correct."
            )
        } else {
            format!(
                "Failed to connect to model API at '{api_url}'. \
                 Check MODEL_BASE_URL and network connectivity."
            )
        };
        return ChatError::Transport { message };
    }

    ChatError::Transport {
        message: format!("Failed to call model API at '{api_url}': {err}"),
    }
}
