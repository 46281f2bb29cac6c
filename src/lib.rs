//! # anyagok-ai
//!
//! 面向教学资料 CMS 的 AI 提供方抽象层：统一的对话/流式接口、主备切换与响应缓存。
//!
//! Provider-agnostic AI chat layer for the "Anyagok Profiknak" teaching-material
//! CMS. Callers hand in role-tagged messages and get back a completed reply or a
//! stream of content deltas, without knowing which vendor answered.
//!
//! ## Key Features
//!
//! - **One adapter trait**: [`ProviderDriver`] hides the OpenAI and Claude wire formats
//! - **Failover**: [`ProviderFactory`] retries each provider with capped exponential
//!   backoff and switches from the primary to the fallback provider
//! - **Caching**: content-addressed, TTL- and capacity-bound [`ResponseCache`]
//! - **Streaming**: replies as a `Stream` of [`StreamChunk`] values; errors are values
//! - **Configuration**: environment variables or YAML via [`AiConfig`]
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use anyagok_ai::{AiConfig, Message, ProviderFactory};
//!
//! #[tokio::main]
//! async fn main() -> anyagok_ai::Result<()> {
//!     let factory = ProviderFactory::from_config(&AiConfig::from_env()?)?;
//!
//!     let reply = factory
//!         .chat(&[
//!             Message::system("You write HTML worksheets for primary school teachers."),
//!             Message::user("A short worksheet about fractions, please."),
//!         ])
//!         .await?;
//!     println!("{}", reply.content);
//!
//!     factory.shutdown();
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`types`] | Messages, responses and stream chunks |
//! | [`drivers`] | Vendor adapters behind [`ProviderDriver`] |
//! | [`transport`] | HTTP and SSE plumbing shared by the adapters |
//! | [`cache`] | Response cache with TTL, capacity and statistics |
//! | [`client`] | [`ProviderFactory`]: cache-first chat, retry and failover |
//! | [`config`] | Environment and YAML configuration |

pub mod cache;
pub mod client;
pub mod config;
pub mod drivers;
pub mod transport;
pub mod types;

// Re-export main types for convenience
pub use cache::{CacheConfig, CacheKey, CacheStats, ResponseCache};
pub use client::{ChatOptions, ProviderFactory, ProviderFactoryBuilder, RetryPolicy};
pub use config::AiConfig;
pub use drivers::{ProviderDriver, ProviderKind, ProviderSettings};
pub use types::{ChatResponse, ChunkStream, Message, MessageRole, StreamChunk, Usage};

pub use tokio_util::sync::CancellationToken;

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for the library
pub mod error;
pub use error::{Error, ErrorContext, ProviderError, ProviderErrorKind};
