//! Server-Sent Events decoder (bytes -> events).
//!
//! - frames are split on a blank line (`\r` is dropped, so CRLF works too)
//! - `event:` and `data:` fields are collected, comment lines are ignored
//! - a `[DONE]` payload ends the stream
//! - bytes are buffered until a frame is complete, so multi-byte UTF-8
//!   characters split across network chunks survive intact

use super::http::ProviderStream;
use futures::{stream, StreamExt};

const DONE_SIGNAL: &str = "[DONE]";

/// One decoded SSE frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseEvent {
    pub event: Option<String>,
    pub data: String,
}

enum Frame {
    Event(SseEvent),
    Done,
    Skip,
}

fn parse_frame(raw: &[u8]) -> Frame {
    let text = String::from_utf8_lossy(raw);
    let mut event = None;
    let mut data: Vec<&str> = Vec::new();

    for line in text.lines() {
        if line.starts_with(':') {
            continue;
        }
        if let Some(v) = line.strip_prefix("event:") {
            event = Some(v.trim().to_string());
        } else if let Some(v) = line.strip_prefix("data:") {
            data.push(v.strip_prefix(' ').unwrap_or(v));
        }
    }

    if data.is_empty() {
        return Frame::Skip;
    }
    let data = data.join("\n");
    if data.trim() == DONE_SIGNAL {
        return Frame::Done;
    }
    Frame::Event(SseEvent { event, data })
}

fn frame_end(buf: &[u8]) -> Option<usize> {
    buf.windows(2).position(|w| w == b"\n\n")
}

/// Decode a byte stream into SSE events.
///
/// Transport errors are passed through and end the stream.
pub fn decode_sse(input: ProviderStream<bytes::Bytes>) -> ProviderStream<SseEvent> {
    let stream = stream::unfold(
        (input, Vec::<u8>::new(), false),
        |(mut input, mut buf, finished)| async move {
            if finished {
                return None;
            }
            loop {
                if let Some(idx) = frame_end(&buf) {
                    let frame: Vec<u8> = buf.drain(..idx + 2).collect();
                    match parse_frame(&frame[..idx]) {
                        Frame::Event(ev) => return Some((Ok(ev), (input, buf, false))),
                        Frame::Done => return None,
                        Frame::Skip => continue,
                    }
                }

                match input.next().await {
                    Some(Ok(bytes)) => {
                        buf.extend(bytes.iter().copied().filter(|b| *b != b'\r'));
                    }
                    Some(Err(e)) => return Some((Err(e), (input, buf, true))),
                    None => {
                        // EOF: a final frame may lack the trailing blank line.
                        let rest = std::mem::take(&mut buf);
                        return match parse_frame(&rest) {
                            Frame::Event(ev) => Some((Ok(ev), (input, buf, true))),
                            Frame::Done | Frame::Skip => None,
                        };
                    }
                }
            }
        },
    );
    Box::pin(stream)
}
