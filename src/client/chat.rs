use futures::stream;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::client::core::ProviderFactory;
use crate::error::ProviderError;
use crate::types::{ChunkStream, Message, StreamChunk};
use crate::{Error, Result};

impl ProviderFactory {
    /// Stream a reply from the first provider that manages to start one.
    ///
    /// No cache, no retry. A stream that has started is forwarded as-is,
    /// including its terminal `Error` chunk on failure. A non-fatal start
    /// failure on the primary moves on to the fallback; `Auth` and `Cancelled`
    /// are returned as `Err`. When no provider starts, the returned stream is a
    /// single `Error` chunk naming the last failure.
    pub async fn stream_chat(
        &self,
        messages: &[Message],
        cancel: Option<&CancellationToken>,
    ) -> Result<ChunkStream> {
        Self::validate(messages)?;
        let request_id = Uuid::new_v4().to_string();

        let mut last: Option<ProviderError> = None;
        for (index, driver) in self.candidates()?.iter().enumerate() {
            match driver.stream_chat(messages, cancel).await {
                Ok(stream) => {
                    info!(
                        request_id = request_id.as_str(),
                        provider = driver.provider_id(),
                        model = driver.model(),
                        "stream started"
                    );
                    return Ok(stream);
                }
                Err(e) if e.is_fatal() => {
                    warn!(
                        request_id = request_id.as_str(),
                        provider = driver.provider_id(),
                        error = %e,
                        "stream rejected with a non-recoverable error"
                    );
                    return Err(e.into());
                }
                Err(e) if index == 0 => {
                    warn!(
                        request_id = request_id.as_str(),
                        provider = driver.provider_id(),
                        error = %e,
                        "primary provider failed to start stream"
                    );
                    last = Some(e);
                }
                Err(e) => {
                    error!(
                        request_id = request_id.as_str(),
                        provider = driver.provider_id(),
                        error = %e,
                        "fallback provider failed to start stream"
                    );
                    last = Some(e);
                }
            }
        }

        let message = match last {
            Some(e) => Error::all_failed(e).to_string(),
            None => Error::ProviderNotConfigured(self.primary).to_string(),
        };
        Ok(Box::pin(stream::iter([StreamChunk::error(message)])))
    }
}
