//! 类型系统模块：定义聊天消息、响应与流式数据块。
//!
//! # Types Module
//!
//! Core value types shared by every provider adapter and by the factory.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Message`] | Chat message with role and text content |
//! | [`MessageRole`] | Message role (system, user, assistant) |
//! | [`ChatResponse`] | Fully materialized non-streaming reply |
//! | [`StreamChunk`] | One element of a streaming reply |
//!
//! ## Example
//!
//! ```rust
//! use anyagok_ai::types::{Message, MessageRole};
//!
//! let conversation = vec![
//!     Message::system("You write HTML teaching material."),
//!     Message::user("Create a worksheet about fractions."),
//! ];
//! assert_eq!(conversation[1].role, MessageRole::User);
//! ```

pub mod events;
pub mod message;
pub mod response;

pub use events::{ChunkStream, StreamChunk};
pub use message::{Message, MessageRole};
pub use response::{ChatResponse, Usage};
