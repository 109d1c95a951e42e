//! Streaming handshake with a peer's SSE endpoint.
//!
//! Opening the stream is how a probe tells a live peer from a closed port.
//! A successful handshake yields a [`StreamHandle`] that owns the connection;
//! its background reader logs what the peer sends and the connection is
//! released when the handle is dropped.

use futures_util::StreamExt;
use portgate_core::{PortgateError, PortgateResult};
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use tokio::task::JoinHandle;
use tracing::debug;

/// Bytes of an unfinished event kept at most; older bytes are dropped.
const MAX_BUFFERED_BYTES: usize = 64 * 1024;

/// A parsed SSE event from a `text/event-stream` response.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SseEvent {
    /// The `event:` field (event type). `None` means a plain `message`.
    pub event: Option<String>,
    /// The `data:` field, accumulated across multiple `data:` lines.
    pub data: String,
}

/// Incremental SSE decoder: feed it raw chunks, get back complete events.
///
/// Events are separated by blank lines; a chunk may end mid-event, in which
/// case the tail is kept until the rest arrives. The tail is capped at
/// [`MAX_BUFFERED_BYTES`], so a peer that never ends an event cannot grow it
/// without bound.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    /// Prefix of `buffer` already searched for a separator.
    scanned: usize,
}

impl SseDecoder {
    /// Append a chunk and drain every event it completes.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        self.buffer.extend(chunk.iter().copied().filter(|b| *b != b'\r'));

        let mut events = Vec::new();
        // Back up one byte: a separator may straddle two chunks.
        let mut from = self.scanned.saturating_sub(1);
        while let Some(offset) = self.buffer[from..].windows(2).position(|w| w == b"\n\n") {
            let end = from + offset;
            let raw: Vec<u8> = self.buffer.drain(..end + 2).collect();
            if let Some(event) = parse_event(&String::from_utf8_lossy(&raw[..end])) {
                events.push(event);
            }
            from = 0;
        }

        if self.buffer.len() > MAX_BUFFERED_BYTES {
            let excess = self.buffer.len() - MAX_BUFFERED_BYTES;
            self.buffer.drain(..excess);
        }
        self.scanned = self.buffer.len();
        events
    }
}

/// Parse one event block. Blocks without a `data:` line carry no event.
fn parse_event(block: &str) -> Option<SseEvent> {
    let mut event = SseEvent::default();
    let mut has_data = false;

    for line in block.lines() {
        if line.is_empty() || line.starts_with(':') {
            continue;
        }

        let (field, value) = match line.find(':') {
            Some(colon) => {
                let value = &line[colon + 1..];
                (&line[..colon], value.strip_prefix(' ').unwrap_or(value))
            }
            None => (line, ""),
        };

        match field {
            "event" => event.event = Some(value.to_string()),
            "data" => {
                if has_data {
                    event.data.push('\n');
                }
                event.data.push_str(value);
                has_data = true;
            }
            // `id`, `retry` and unknown fields are ignored.
            _ => {}
        }
    }

    has_data.then_some(event)
}

/// An open handshake stream with a peer.
///
/// Dropping the handle aborts the reader task, which closes the connection.
#[derive(Debug)]
pub struct StreamHandle {
    reader: JoinHandle<()>,
}

impl StreamHandle {
    /// Open the handshake stream at `url`.
    ///
    /// The handshake is open once the peer answers 2xx with a
    /// `text/event-stream` body; anything else is an error. No deadline is
    /// applied here, callers bound the wait themselves.
    pub async fn open(http: &reqwest::Client, url: &str) -> PortgateResult<Self> {
        let resp = http
            .get(url)
            .header(ACCEPT, "text/event-stream")
            .send()
            .await
            .map_err(|e| PortgateError::Http(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(PortgateError::Http(format!(
                "handshake at {url} answered with status {status}"
            )));
        }

        let content_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        if !content_type.starts_with("text/event-stream") {
            return Err(PortgateError::Protocol(format!(
                "handshake at {url} returned content type '{content_type}'"
            )));
        }

        let url = url.to_string();
        let mut stream = resp.bytes_stream();
        let reader = tokio::spawn(async move {
            let mut decoder = SseDecoder::default();
            while let Some(chunk) = stream.next().await {
                let bytes = match chunk {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        debug!(url = %url, error = %e, "Handshake stream read failed");
                        return;
                    }
                };
                for event in decoder.push(&bytes) {
                    match event.event.as_deref() {
                        Some("endpoint") => {
                            debug!(url = %url, endpoint = %event.data, "Peer announced endpoint");
                        }
                        kind => {
                            debug!(url = %url, event = ?kind, data = %event.data, "Peer stream message");
                        }
                    }
                }
            }
            debug!(url = %url, "Handshake stream closed by peer");
        });

        Ok(Self { reader })
    }
}

impl Drop for StreamHandle {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_endpoint_event() {
        let mut decoder = SseDecoder::default();
        let events = decoder.push(b"event: endpoint\ndata: /mcp?session=abc\n\n");
        assert_eq!(
            events,
            vec![SseEvent {
                event: Some("endpoint".into()),
                data: "/mcp?session=abc".into(),
            }]
        );
    }

    #[test]
    fn test_decode_across_chunks() {
        let mut decoder = SseDecoder::default();
        assert!(decoder.push(b"data: {\"a\"").is_empty());
        assert!(decoder.push(b":1}\n").is_empty());
        let events = decoder.push(b"\ndata: second\n\n");
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].data, "{\"a\":1}");
        assert_eq!(events[0].event, None);
        assert_eq!(events[1].data, "second");
    }

    #[test]
    fn test_decode_crlf_and_multiline_data() {
        let mut decoder = SseDecoder::default();
        let events = decoder.push(b"data: line1\r\ndata: line2\r\n\r\n");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data, "line1\nline2");
    }

    #[test]
    fn test_separator_split_across_chunks() {
        let mut decoder = SseDecoder::default();
        assert!(decoder.push(b"data: a\n").is_empty());
        let events = decoder.push(b"\ndata: b\n\n");
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].data, "a");
        assert_eq!(events[1].data, "b");
    }

    #[test]
    fn test_unterminated_event_is_capped() {
        let mut decoder = SseDecoder::default();
        let chunk = vec![b'x'; 16 * 1024];
        decoder.push(b"data: ");
        for _ in 0..10 {
            assert!(decoder.push(&chunk).is_empty());
            assert!(decoder.buffer.len() <= MAX_BUFFERED_BYTES);
        }
        assert_eq!(decoder.buffer.len(), MAX_BUFFERED_BYTES);
        assert_eq!(decoder.scanned, MAX_BUFFERED_BYTES);

        // The truncated event is flushed by its separator and decoding resumes.
        decoder.push(b"\n\n");
        let events = decoder.push(b"event: endpoint\ndata: /mcp\n\n");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event.as_deref(), Some("endpoint"));
        assert!(decoder.buffer.is_empty());
    }

    #[test]
    fn test_decode_skips_comments_and_dataless_blocks() {
        let mut decoder = SseDecoder::default();
        let events = decoder.push(b": keepalive\n\nevent: ping\n\nid: 4\ndata:x\n\n");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data, "x");
    }
}
