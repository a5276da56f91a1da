//! Streaming relay: upstream event-stream bytes in, text fragments out
//!
//! The upstream body arrives as arbitrary byte chunks. [`LineFramer`] turns
//! them into complete lines, [`classify_line`] decides what each line means,
//! and [`relay`] drives both lazily so the upstream is only read when the
//! consumer asks for the next fragment.

use async_stream::stream;
use bytes::Bytes;
use futures::{Stream, StreamExt};

use crate::api::StreamChunk;

/// Prefix carried by event lines
pub const DATA_MARKER: &str = "data:";

/// Payload that ends a completion stream
pub const SENTINEL: &str = "[DONE]";

/// One incremental piece of generated text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamFragment(pub String);

impl StreamFragment {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<StreamFragment> for Bytes {
    fn from(fragment: StreamFragment) -> Self {
        Bytes::from(fragment.0)
    }
}

/// Lifecycle of a single relay
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayState {
    Connecting,
    Streaming,
    /// Sentinel observed
    Completed,
    /// Body ended without a sentinel
    UpstreamClosed,
    /// Transport error while reading the body
    Failed,
}

impl RelayState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RelayState::Completed | RelayState::UpstreamClosed | RelayState::Failed)
    }
}

/// What a single upstream line means to the relay
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineEvent {
    /// Nothing to forward: blank, keep-alive, malformed or empty delta
    Skip,
    Fragment(String),
    Done,
}

/// Decide what one line of the upstream stream means.
///
/// This is the only place the skip-on-malformed policy lives: anything that
/// does not parse into a chunk with a non-empty first delta is skipped.
pub fn classify_line(line: &str) -> LineEvent {
    if line.is_empty() {
        return LineEvent::Skip;
    }

    let payload = match line.strip_prefix(DATA_MARKER) {
        Some(rest) => rest.trim(),
        None => line.trim(),
    };

    if payload.is_empty() {
        return LineEvent::Skip;
    }
    if payload == SENTINEL {
        return LineEvent::Done;
    }

    match serde_json::from_str::<StreamChunk>(payload) {
        Ok(chunk) => match chunk.first_delta() {
            Some(text) if !text.is_empty() => LineEvent::Fragment(text.to_string()),
            _ => LineEvent::Skip,
        },
        Err(e) => {
            tracing::trace!(error = %e, payload = payload, "Skipping unparseable stream line");
            LineEvent::Skip
        }
    }
}

/// Splits a byte stream into lines, buffering partial lines between chunks.
///
/// Decoding happens per complete line so multi-byte characters split across
/// chunks come out intact.
#[derive(Debug, Default)]
pub struct LineFramer {
    buffer: Vec<u8>,
}

impl LineFramer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk, returning every line it completed.
    ///
    /// Lines end at `\n`, `\r\n` or a lone `\r`. A `\r` at the very end of
    /// the buffer is held back until the next byte shows which one it was.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);

        let mut lines = Vec::new();
        let mut start = 0;
        while let Some(offset) = self.buffer[start..].iter().position(|&b| b == b'\n' || b == b'\r') {
            let end = start + offset;
            let next = if self.buffer[end] == b'\r' {
                match self.buffer.get(end + 1) {
                    Some(b'\n') => end + 2,
                    Some(_) => end + 1,
                    None => break,
                }
            } else {
                end + 1
            };
            lines.push(decode_line(&self.buffer[start..end]));
            start = next;
        }
        self.buffer.drain(..start);
        lines
    }

    /// Flush the trailing unterminated line, if any
    pub fn finish(&mut self) -> Option<String> {
        if self.buffer.is_empty() {
            return None;
        }
        let line = decode_line(&self.buffer);
        self.buffer.clear();
        Some(line)
    }
}

fn decode_line(raw: &[u8]) -> String {
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
    String::from_utf8_lossy(raw).into_owned()
}

/// Relay text fragments out of an upstream event-stream body.
///
/// The returned stream ends on the sentinel, at end of body, or on the first
/// transport error. Errors are logged, never yielded. Dropping the stream
/// drops `upstream`, which closes the upstream connection.
pub fn relay<S, B, E>(upstream: S) -> impl Stream<Item = StreamFragment>
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send,
    E: std::fmt::Display + Send,
{
    stream! {
        let mut state = RelayState::Streaming;
        let mut framer = LineFramer::new();
        let mut fragments = 0usize;
        futures::pin_mut!(upstream);

        'read: while !state.is_terminal() {
            let lines = match upstream.next().await {
                Some(Ok(chunk)) => framer.push(chunk.as_ref()),
                Some(Err(e)) => {
                    tracing::warn!(error = %e, fragments, "Upstream stream failed, ending relay");
                    state = RelayState::Failed;
                    break 'read;
                }
                None => {
                    state = RelayState::UpstreamClosed;
                    framer.finish().into_iter().collect()
                }
            };

            for line in lines {
                match classify_line(&line) {
                    LineEvent::Skip => {}
                    LineEvent::Done => {
                        state = RelayState::Completed;
                        break 'read;
                    }
                    LineEvent::Fragment(text) => {
                        fragments += 1;
                        yield StreamFragment(text);
                    }
                }
            }
        }

        tracing::debug!(state = ?state, fragments, "Relay finished");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    fn event(text: &str) -> String {
        format!("data: {}\n\n", serde_json::json!({"choices": [{"delta": {"content": text}}]}))
    }

    fn ok_chunks(chunks: Vec<String>) -> impl Stream<Item = Result<Bytes, std::io::Error>> + Send + 'static {
        stream::iter(chunks.into_iter().map(|c| Ok(Bytes::from(c))))
    }

    async fn collect<S>(upstream: S) -> Vec<String>
    where
        S: Stream<Item = Result<Bytes, std::io::Error>> + Send + 'static,
    {
        relay(upstream).map(|f| f.0).collect().await
    }

    #[test]
    fn test_classify_blank_and_marker_only() {
        assert_eq!(classify_line(""), LineEvent::Skip);
        assert_eq!(classify_line("data:"), LineEvent::Skip);
        assert_eq!(classify_line("data:    "), LineEvent::Skip);
        assert_eq!(classify_line("   "), LineEvent::Skip);
    }

    #[test]
    fn test_classify_sentinel() {
        assert_eq!(classify_line("data: [DONE]"), LineEvent::Done);
        assert_eq!(classify_line("data:[DONE]"), LineEvent::Done);
        assert_eq!(classify_line("[DONE]"), LineEvent::Done);
    }

    #[test]
    fn test_classify_fragment_with_and_without_marker() {
        let json = r#"{"choices":[{"delta":{"content":"Hi"}}]}"#;
        assert_eq!(classify_line(&format!("data: {}", json)), LineEvent::Fragment("Hi".to_string()));
        assert_eq!(classify_line(&format!("  {}  ", json)), LineEvent::Fragment("Hi".to_string()));
    }

    #[test]
    fn test_classify_malformed_and_empty_deltas() {
        assert_eq!(classify_line("data: {not json"), LineEvent::Skip);
        assert_eq!(classify_line(": keep-alive"), LineEvent::Skip);
        assert_eq!(classify_line(r#"data: {"choices":[]}"#), LineEvent::Skip);
        assert_eq!(classify_line(r#"data: {"choices":[{"delta":{}}]}"#), LineEvent::Skip);
        assert_eq!(classify_line(r#"data: {"choices":[{"delta":{"content":""}}]}"#), LineEvent::Skip);
        assert_eq!(classify_line(r#"data: {"choices":[{"delta":{"content":null}}]}"#), LineEvent::Skip);
        assert_eq!(classify_line(r#"data: {"error":"overloaded"}"#), LineEvent::Skip);
    }

    #[test]
    fn test_framer_splits_across_chunks() {
        let mut framer = LineFramer::new();
        assert!(framer.push(b"data: ab").is_empty());
        assert_eq!(framer.push(b"c\n\ndata: d\r\n"), vec!["data: abc", "", "data: d"]);
        assert_eq!(framer.finish(), None);
    }

    #[test]
    fn test_framer_lone_carriage_return_ends_line() {
        let mut framer = LineFramer::new();
        assert_eq!(framer.push(b"data: a\rdata: b\r"), vec!["data: a"]);
        // held-back CR turns out to be half of a CRLF
        assert_eq!(framer.push(b"\ndata: c\r\r"), vec!["data: b", "data: c"]);
        assert_eq!(framer.finish().as_deref(), Some(""));
    }

    #[test]
    fn test_framer_keeps_split_utf8() {
        let text = "data: héllo\n".as_bytes();
        // split inside the two-byte 'é'
        let split = text.iter().position(|&b| b == 0xC3).unwrap() + 1;

        let mut framer = LineFramer::new();
        assert!(framer.push(&text[..split]).is_empty());
        assert_eq!(framer.push(&text[split..]), vec!["data: héllo"]);
    }

    #[test]
    fn test_framer_flushes_trailing_line() {
        let mut framer = LineFramer::new();
        assert!(framer.push(b"data: [DONE]").is_empty());
        assert_eq!(framer.finish().as_deref(), Some("data: [DONE]"));
        assert_eq!(framer.finish(), None);
    }

    #[tokio::test]
    async fn test_relay_stops_at_sentinel() {
        let body = vec![event("Hel"), event("lo"), "data: [DONE]\n\n".to_string(), event("ignored")];
        assert_eq!(collect(ok_chunks(body)).await, vec!["Hel", "lo"]);
    }

    #[tokio::test]
    async fn test_relay_skips_malformed_line() {
        let body = vec![event("Hel"), "data: {\"choices\": [oops\n\n".to_string(), event("lo"), "data: [DONE]\n\n".to_string()];
        assert_eq!(collect(ok_chunks(body)).await, vec!["Hel", "lo"]);
    }

    #[tokio::test]
    async fn test_relay_reassembles_lines_split_across_chunks() {
        let whole = format!("{}{}data: [DONE]\n\n", event("Hel"), event("lo"));
        let chunks: Vec<String> = whole
            .as_bytes()
            .chunks(7)
            .map(|c| String::from_utf8(c.to_vec()).unwrap())
            .collect();
        assert_eq!(collect(ok_chunks(chunks)).await, vec!["Hel", "lo"]);
    }

    #[tokio::test]
    async fn test_relay_ends_when_upstream_closes() {
        // No sentinel; last event has no trailing newline
        let body = vec![event("a"), r#"data: {"choices":[{"delta":{"content":"b"}}]}"#.to_string()];
        assert_eq!(collect(ok_chunks(body)).await, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_relay_ends_on_transport_error() {
        let chunks = vec![
            Ok(Bytes::from(event("a"))),
            Err(std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset")),
            Ok(Bytes::from(event("never"))),
        ];
        assert_eq!(collect(stream::iter(chunks)).await, vec!["a"]);
    }

    #[tokio::test]
    async fn test_relay_empty_body() {
        assert!(collect(ok_chunks(Vec::new())).await.is_empty());
    }

    #[tokio::test]
    async fn test_relay_crlf_framing() {
        let body = vec!["data: {\"choices\":[{\"delta\":{\"content\":\"x\"}}]}\r\n\r\ndata: [DONE]\r\n".to_string()];
        assert_eq!(collect(ok_chunks(body)).await, vec!["x"]);
    }

    #[tokio::test]
    async fn test_relay_cr_only_framing() {
        let body = format!("{}{}data: [DONE]\n\n", event("Hel"), event("lo")).replace('\n', "\r");
        let chunks: Vec<String> = body
            .as_bytes()
            .chunks(5)
            .map(|c| String::from_utf8(c.to_vec()).unwrap())
            .collect();
        assert_eq!(collect(ok_chunks(chunks)).await, vec!["Hel", "lo"]);
    }

    #[tokio::test]
    async fn test_relay_is_lazy() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::Arc;

        let pulled = Arc::new(AtomicUsize::new(0));
        let counter = pulled.clone();
        let upstream = stream::iter((0..100).map(|i| event(&i.to_string()))).map(move |c| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok::<_, std::io::Error>(Bytes::from(c))
        });

        let first_two: Vec<_> = relay(upstream).take(2).collect().await;
        assert_eq!(first_two.len(), 2);
        assert_eq!(pulled.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_terminal_states() {
        assert!(!RelayState::Connecting.is_terminal());
        assert!(!RelayState::Streaming.is_terminal());
        assert!(RelayState::Completed.is_terminal());
        assert!(RelayState::UpstreamClosed.is_terminal());
        assert!(RelayState::Failed.is_terminal());
    }
}
