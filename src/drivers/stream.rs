use futures::{stream, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::transport::{ProviderStream, SseEvent};
use crate::types::events::STREAM_CANCELLED_MESSAGE;
use crate::types::{ChunkStream, StreamChunk};

/// Maps one SSE frame to a chunk; `None` skips the frame.
pub(crate) type EventParser = fn(&SseEvent) -> Option<StreamChunk>;

struct State {
    provider: String,
    events: ProviderStream<SseEvent>,
    parse: EventParser,
    cancel: Option<CancellationToken>,
    finished: bool,
}

enum Next {
    Cancelled,
    Item(Option<Result<SseEvent, crate::error::ProviderError>>),
}

/// Turn decoded SSE frames into a chunk stream with exactly one terminal chunk.
///
/// Transport failures and cancellation become a terminal `Error` chunk; a
/// source that ends without a terminal frame is closed with `Done`.
pub(crate) fn chunk_stream(
    provider: &str,
    events: ProviderStream<SseEvent>,
    parse: EventParser,
    cancel: Option<CancellationToken>,
) -> ChunkStream {
    let state = State {
        provider: provider.to_string(),
        events,
        parse,
        cancel,
        finished: false,
    };

    let stream = stream::unfold(state, |mut st| async move {
        if st.finished {
            return None;
        }
        loop {
            let next = match st.cancel.clone() {
                Some(token) => tokio::select! {
                    biased;
                    _ = token.cancelled() => Next::Cancelled,
                    item = st.events.next() => Next::Item(item),
                },
                None => Next::Item(st.events.next().await),
            };

            match next {
                Next::Cancelled => {
                    debug!(provider = st.provider.as_str(), "stream cancelled by caller");
                    st.finished = true;
                    return Some((StreamChunk::error(STREAM_CANCELLED_MESSAGE), st));
                }
                Next::Item(Some(Ok(event))) => {
                    if let Some(chunk) = (st.parse)(&event) {
                        st.finished = chunk.is_terminal();
                        return Some((chunk, st));
                    }
                }
                Next::Item(Some(Err(e))) => {
                    warn!(provider = st.provider.as_str(), error = %e, "stream failed after start");
                    st.finished = true;
                    return Some((StreamChunk::error(e.to_string()), st));
                }
                Next::Item(None) => {
                    st.finished = true;
                    return Some((StreamChunk::Done, st));
                }
            }
        }
    });
    Box::pin(stream)
}
