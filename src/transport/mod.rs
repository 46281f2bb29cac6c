//! HTTP plumbing shared by the provider adapters.

pub mod http;
pub mod sse;

pub use http::{extract_error_message, HttpTransport, ProviderStream};
pub use sse::{decode_sse, SseEvent};
