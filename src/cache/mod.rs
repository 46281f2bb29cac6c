//! 响应缓存模块：按会话内容寻址的内存缓存，避免重复调用 AI 厂商接口。
//!
//! # Response Caching Module
//!
//! Memoizes non-streaming chat replies so that an identical conversation sent
//! to the same model is answered without a network call.
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`ResponseCache`] | Shared cache handle with TTL, capacity and statistics |
//! | [`CacheConfig`] | TTL, entry limit and sweep interval |
//! | [`CacheKey`] | SHA-256 digest of `(messages, model)` |
//! | [`CacheEntry`] | Stored reply plus provider/model metadata |
//! | [`SweepHandle`] | Owner of the background expiry task |
//!
//! ## Eviction
//!
//! When a new key arrives at capacity, the entry inserted first is removed.
//! Reads do not refresh an entry's position, so this is insertion order, not
//! recency.
//!
//! ## Example
//!
//! ```rust
//! use anyagok_ai::cache::{CacheConfig, ResponseCache};
//! use anyagok_ai::Message;
//!
//! let cache = ResponseCache::new(CacheConfig::new().with_ttl_hours(24).with_max_entries(1000));
//! let key = ResponseCache::generate_key(&[Message::user("Hello")], "gpt-4o");
//! cache.set(key.clone(), "Hi there", "openai", "gpt-4o");
//! assert_eq!(cache.get(&key).as_deref(), Some("Hi there"));
//! assert_eq!(cache.stats().hits, 1);
//! ```

mod backend;
mod key;
mod manager;

pub use backend::CacheEntry;
pub use key::{CacheKey, LOGGED_KEY_LEN};
pub use manager::{CacheConfig, CacheStats, ResponseCache, SweepHandle};
