//! Streaming chunks emitted by `stream_chat`.

use futures::Stream;
use serde::{Deserialize, Serialize};
use std::pin::Pin;

/// Message carried by the terminal error chunk of a cancelled stream.
pub const STREAM_CANCELLED_MESSAGE: &str = "Stream cancelled by caller";

/// One element of a streaming reply.
///
/// `Error` and `Done` are terminal: nothing follows them. Failures that happen
/// after a stream started arrive as an `Error` value, never as a panic or an
/// `Err` from polling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
#[non_exhaustive]
pub enum StreamChunk {
    /// Incremental text produced by the model.
    ContentDelta { content: String },

    /// Completed HTML document. Reserved for content-generation layers built
    /// on top of the generic adapters; the adapters never emit it.
    HtmlGenerated { html: String },

    /// Terminal failure.
    Error { message: String },

    /// Terminal success.
    Done,
}

impl StreamChunk {
    pub fn delta(content: impl Into<String>) -> Self {
        StreamChunk::ContentDelta {
            content: content.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        StreamChunk::Error {
            message: message.into(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamChunk::Error { .. } | StreamChunk::Done)
    }

    pub fn content(&self) -> Option<&str> {
        match self {
            StreamChunk::ContentDelta { content } => Some(content),
            _ => None,
        }
    }
}

/// A lazy, finite, non-restartable sequence of chunks.
pub type ChunkStream = Pin<Box<dyn Stream<Item = StreamChunk> + Send + 'static>>;
