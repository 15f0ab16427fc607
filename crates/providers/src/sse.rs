//! Server-sent-events plumbing for streaming responses.
//!
//! The wire format delimits events with `\n\n`; each event block may carry
//! `event:`, `data:`, `id:`, or `retry:` lines, of which only `data:`
//! matters here. [`SseBuffer`] accumulates body chunks and yields complete
//! payloads; [`event_stream`] turns a `reqwest::Response` plus a payload
//! parser into a [`BoxStream`] of [`StreamEvent`]s.

use rto_domain::error::Result;
use rto_domain::stream::{BoxStream, StreamEvent};

use crate::util::from_reqwest;

/// Incremental buffer over an SSE body. Partial events survive across
/// chunk boundaries.
#[derive(Default)]
pub(crate) struct SseBuffer {
    buf: String,
}

impl SseBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, chunk: &str) {
        self.buf.push_str(chunk);
    }

    /// Pull the `data:` payloads of every complete event out of the buffer.
    pub fn drain_events(&mut self) -> Vec<String> {
        let mut payloads = Vec::new();
        while let Some(pos) = self.buf.find("\n\n") {
            let block: String = self.buf.drain(..pos + 2).collect();
            for line in block.lines() {
                if let Some(data) = line.trim().strip_prefix("data:") {
                    let data = data.trim();
                    if !data.is_empty() {
                        payloads.push(data.to_string());
                    }
                }
            }
        }
        payloads
    }

    /// Terminate the stream: treat whatever remains as a final event.
    pub fn finish(&mut self) -> Vec<String> {
        if self.buf.trim().is_empty() {
            self.buf.clear();
            return Vec::new();
        }
        self.buf.push_str("\n\n");
        self.drain_events()
    }
}

/// Build a [`BoxStream`] of [`StreamEvent`]s from an SSE response body and a
/// payload parser. The parser is `FnMut` because adapters keep mutable
/// assembly state (open tool-use blocks, usage) across payloads.
///
/// If the body closes without the parser ever emitting `Done`, a synthetic
/// `Done` is appended so consumers always see a terminal event.
pub(crate) fn event_stream<F>(
    response: reqwest::Response,
    mut parse: F,
) -> BoxStream<'static, Result<StreamEvent>>
where
    F: FnMut(&str) -> Vec<Result<StreamEvent>> + Send + 'static,
{
    Box::pin(async_stream::stream! {
        let mut response = response;
        let mut buffer = SseBuffer::new();
        let mut done_emitted = false;

        loop {
            match response.chunk().await {
                Ok(Some(bytes)) => {
                    buffer.push(&String::from_utf8_lossy(&bytes));
                    for payload in buffer.drain_events() {
                        for event in parse(&payload) {
                            done_emitted |= matches!(&event, Ok(StreamEvent::Done { .. }));
                            yield event;
                        }
                    }
                }
                Ok(None) => {
                    for payload in buffer.finish() {
                        for event in parse(&payload) {
                            done_emitted |= matches!(&event, Ok(StreamEvent::Done { .. }));
                            yield event;
                        }
                    }
                    break;
                }
                Err(e) => {
                    yield Err(from_reqwest(e));
                    break;
                }
            }
        }

        if !done_emitted {
            yield Ok(StreamEvent::Done { usage: None, stop_reason: None });
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn complete_event_is_drained() {
        let mut buf = SseBuffer::new();
        buf.push("event: message\ndata: {\"a\":1}\n\n");
        assert_eq!(buf.drain_events(), vec!["{\"a\":1}"]);
        assert!(buf.drain_events().is_empty());
    }

    #[test]
    fn multiple_events_in_one_chunk() {
        let mut buf = SseBuffer::new();
        buf.push("data: one\n\ndata: two\n\n");
        assert_eq!(buf.drain_events(), vec!["one", "two"]);
    }

    #[test]
    fn partial_event_waits_for_more_input() {
        let mut buf = SseBuffer::new();
        buf.push("data: complete\n\ndata: par");
        assert_eq!(buf.drain_events(), vec!["complete"]);
        buf.push("tial\n\n");
        assert_eq!(buf.drain_events(), vec!["partial"]);
    }

    #[test]
    fn non_data_lines_are_skipped() {
        let mut buf = SseBuffer::new();
        buf.push("event: ping\nid: 7\nretry: 1000\ndata: payload\n\n");
        assert_eq!(buf.drain_events(), vec!["payload"]);
    }

    #[test]
    fn empty_data_lines_are_dropped() {
        let mut buf = SseBuffer::new();
        buf.push("data: \n\n");
        assert!(buf.drain_events().is_empty());
    }

    #[test]
    fn finish_flushes_trailing_event_without_delimiter() {
        let mut buf = SseBuffer::new();
        buf.push("data: last");
        assert!(buf.drain_events().is_empty());
        assert_eq!(buf.finish(), vec!["last"]);
    }

    #[test]
    fn finish_on_empty_buffer_yields_nothing() {
        let mut buf = SseBuffer::new();
        assert!(buf.finish().is_empty());
        buf.push("   \n");
        assert!(buf.finish().is_empty());
    }
}
