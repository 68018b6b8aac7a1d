//! Incremental response consumption: a lazy, finite, non-restartable pull
//! sequence of text chunks decoded from a live byte stream, line by line.

use bytes::Bytes;
use futures::Stream;
use futures::stream::StreamExt;

use crate::error::ChatError;
use crate::providers::{FrameEvent, Provider};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StreamState {
    Reading,
    Done,
    Aborted,
}

/// Pull-based view of a streaming chat response.
///
/// `next_chunk` yields assistant text in arrival order and ends the sequence
/// on the provider's termination signal, on transport EOF, or on an error.
/// Once the sequence has ended it stays ended; chunks emitted before an
/// abort are never retracted. Dropping the stream stops the underlying read.
pub struct ChatStream<S> {
    provider: Provider,
    source: S,
    buf: Vec<u8>,
    state: StreamState,
}

impl<S> std::fmt::Debug for ChatStream<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatStream")
            .field("provider", &self.provider)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl<S> ChatStream<S>
where
    S: Stream<Item = Result<Bytes, ChatError>> + Unpin,
{
    pub fn new(provider: Provider, source: S) -> Self {
        Self {
            provider,
            source,
            buf: Vec::new(),
            state: StreamState::Reading,
        }
    }

    /// Returns the next text chunk, `Ok(None)` once the sequence has ended,
    /// or the error that aborted it. After `Ok(None)` or an error, every
    /// further call returns `Ok(None)`.
    pub async fn next_chunk(&mut self) -> Result<Option<String>, ChatError> {
        if self.state != StreamState::Reading {
            return Ok(None);
        }

        loop {
            while let Some(line) = self.take_line() {
                if let Some(step) = self.apply(&line) {
                    return step;
                }
            }

            match self.source.next().await {
                Some(Ok(bytes)) => self.buf.extend_from_slice(&bytes),
                Some(Err(err)) => {
                    self.state = StreamState::Aborted;
                    return Err(err);
                }
                None => {
                    // EOF without a termination signal still ends the
                    // sequence cleanly; a residual unterminated line is
                    // decoded first.
                    self.state = StreamState::Done;
                    if self.buf.is_empty() {
                        return Ok(None);
                    }
                    let line = String::from_utf8_lossy(&self.buf).into_owned();
                    self.buf.clear();
                    return match self.apply(&line) {
                        Some(step) => step,
                        None => Ok(None),
                    };
                }
            }
        }
    }

    /// Feeds one line through the provider's decoder. `None` means nothing
    /// to report yet; `Some` carries the result to hand to the caller.
    fn apply(&mut self, line: &str) -> Option<Result<Option<String>, ChatError>> {
        match self.provider.decode_stream_line(line) {
            FrameEvent::Ignored => None,
            FrameEvent::Done => {
                self.state = StreamState::Done;
                Some(Ok(None))
            }
            FrameEvent::Error { kind, message } => {
                self.state = StreamState::Aborted;
                Some(Err(ChatError::Api {
                    status: None,
                    kind,
                    message,
                }))
            }
            FrameEvent::Chunk { text, finish } => {
                if finish {
                    self.state = StreamState::Done;
                }
                match text.filter(|text| !text.is_empty()) {
                    Some(text) => Some(Ok(Some(text))),
                    None if finish => Some(Ok(None)),
                    None => None,
                }
            }
        }
    }

    /// Splits one `\n`-terminated line off the front of the buffer, dropping
    /// the newline and any trailing `\r`. Bytes after the last newline stay
    /// buffered so UTF-8 split across network reads reassembles correctly.
    fn take_line(&mut self) -> Option<String> {
        let pos = self.buf.iter().position(|byte| *byte == b'\n')?;
        let mut line: Vec<u8> = self.buf.drain(..=pos).collect();
        line.pop();
        if line.last() == Some(&b'\r') {
            line.pop();
        }
        Some(String::from_utf8_lossy(&line).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use futures::stream;

    use super::ChatStream;
    use crate::error::ChatError;
    use crate::providers::Provider;

    fn sse_stream(
        lines: &[&str],
    ) -> ChatStream<impl futures::Stream<Item = Result<Bytes, ChatError>> + Unpin + use<>> {
        let joined = lines.join("\n");
        from_chunks(Provider::OpenRouter, &[joined.as_str()])
    }

    fn from_chunks(
        provider: Provider,
        chunks: &[&str],
    ) -> ChatStream<impl futures::Stream<Item = Result<Bytes, ChatError>> + Unpin + use<>> {
        let items: Vec<Result<Bytes, ChatError>> = chunks
            .iter()
            .map(|chunk| Ok(Bytes::copy_from_slice(chunk.as_bytes())))
            .collect();
        ChatStream::new(provider, stream::iter(items))
    }

    async fn collect(
        stream: &mut ChatStream<impl futures::Stream<Item = Result<Bytes, ChatError>> + Unpin>,
    ) -> Result<Vec<String>, ChatError> {
        let mut chunks = Vec::new();
        while let Some(chunk) = stream.next_chunk().await? {
            chunks.push(chunk);
        }
        Ok(chunks)
    }

    #[tokio::test]
    async fn sse_chunks_arrive_in_order_until_done() {
        let mut stream = sse_stream(&[
            r#"data: {"choices":[{"delta":{"content":"He"}}]}"#,
            r#"data: {"choices":[{"delta":{"content":"llo"}}]}"#,
            "data: [DONE]",
            "",
        ]);

        let chunks = collect(&mut stream).await.expect("stream should succeed");
        assert_eq!(chunks, vec!["He", "llo"]);
        // The sequence stays ended.
        assert!(stream.next_chunk().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn malformed_frames_are_skipped_not_fatal() {
        let mut stream = sse_stream(&[
            r#"data: {"choices":[{"delta":{"content":"a"}}]}"#,
            "data: {not json}",
            r#"data: {"choices":[{"delta":{"content":"b"}}]}"#,
            "data: [DONE]",
            "",
        ]);

        let chunks = collect(&mut stream).await.expect("stream should succeed");
        assert_eq!(chunks, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn finish_reason_terminates_after_emitting_content() {
        let mut stream = sse_stream(&[
            r#"data: {"choices":[{"delta":{"content":"tail"},"finish_reason":"stop"}]}"#,
            r#"data: {"choices":[{"delta":{"content":"never read"}}]}"#,
            "",
        ]);

        assert_eq!(stream.next_chunk().await.unwrap().as_deref(), Some("tail"));
        assert!(stream.next_chunk().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn in_band_error_aborts_and_stays_aborted() {
        let mut stream = sse_stream(&[
            r#"data: {"choices":[{"delta":{"content":"partial"}}]}"#,
            r#"data: {"error":{"message":"overloaded","type":"server"}}"#,
            "",
        ]);

        assert_eq!(
            stream.next_chunk().await.unwrap().as_deref(),
            Some("partial")
        );
        match stream.next_chunk().await {
            Err(ChatError::Api { status, message, .. }) => {
                assert_eq!(status, None);
                assert_eq!(message, "overloaded");
            }
            other => panic!("expected Api error, got {other:?}"),
        }
        // No transition leaves the aborted state.
        assert!(stream.next_chunk().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn frames_split_across_network_reads_reassemble() {
        let mut stream = from_chunks(
            Provider::OpenRouter,
            &[
                "data: {\"choices\":[{\"delta\":{\"con",
                "tent\":\"He\"}}]}\ndata: {\"choices\":[{\"delta\":{\"content\":\"llo\"}}]}\n",
                "data: [DONE]\n",
            ],
        );

        let chunks = collect(&mut stream).await.expect("stream should succeed");
        assert_eq!(chunks, vec!["He", "llo"]);
    }

    #[tokio::test]
    async fn eof_without_sentinel_ends_the_sequence_cleanly() {
        let mut stream = from_chunks(
            Provider::OpenRouter,
            &["data: {\"choices\":[{\"delta\":{\"content\":\"hi\"}}]}\n"],
        );

        let chunks = collect(&mut stream).await.expect("stream should succeed");
        assert_eq!(chunks, vec!["hi"]);
    }

    #[tokio::test]
    async fn residual_unterminated_line_is_decoded_at_eof() {
        let mut stream = from_chunks(
            Provider::OpenRouter,
            &["data: {\"choices\":[{\"delta\":{\"content\":\"hi\"}}]}"],
        );

        let chunks = collect(&mut stream).await.expect("stream should succeed");
        assert_eq!(chunks, vec!["hi"]);
    }

    #[tokio::test]
    async fn ollama_lines_emit_until_done_flag() {
        let mut stream = from_chunks(
            Provider::Ollama,
            &[concat!(
                "{\"message\":{\"content\":\"Hi\"},\"done\":false}\n",
                "{\"message\":{\"content\":\"\"},\"done\":true}\n",
            )],
        );

        let chunks = collect(&mut stream).await.expect("stream should succeed");
        assert_eq!(chunks, vec!["Hi"]);
        assert!(stream.next_chunk().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn ollama_error_line_aborts_the_stream() {
        let mut stream = from_chunks(Provider::Ollama, &["{\"error\":\"out of memory\"}\n"]);

        match stream.next_chunk().await {
            Err(ChatError::Api { message, .. }) => assert_eq!(message, "out of memory"),
            other => panic!("expected Api error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn transport_error_aborts_with_the_mapped_error() {
        let items: Vec<Result<Bytes, ChatError>> = vec![
            Ok(Bytes::from_static(
                b"data: {\"choices\":[{\"delta\":{\"content\":\"a\"}}]}\n",
            )),
            Err(ChatError::Transport {
                message: "connection reset".to_string(),
            }),
        ];
        let mut stream = ChatStream::new(Provider::OpenRouter, futures::stream::iter(items));

        assert_eq!(stream.next_chunk().await.unwrap().as_deref(), Some("a"));
        match stream.next_chunk().await {
            Err(ChatError::Transport { message }) => assert_eq!(message, "connection reset"),
            other => panic!("expected Transport error, got {other:?}"),
        }
        assert!(stream.next_chunk().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn crlf_terminated_lines_are_handled() {
        let mut stream = from_chunks(
            Provider::OpenRouter,
            &["data: {\"choices\":[{\"delta\":{\"content\":\"hi\"}}]}\r\ndata: [DONE]\r\n"],
        );

        let chunks = collect(&mut stream).await.expect("stream should succeed");
        assert_eq!(chunks, vec!["hi"]);
    }
}
