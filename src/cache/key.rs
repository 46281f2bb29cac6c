//! Cache key generation.

use crate::types::Message;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Number of hex characters of a key that may appear in logs.
pub const LOGGED_KEY_LEN: usize = 16;

/// SHA-256 digest (lowercase hex) identifying one conversation sent to one model.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey {
    pub hash: String,
}

impl CacheKey {
    pub fn new(hash: impl Into<String>) -> Self {
        Self { hash: hash.into() }
    }

    /// Derive the key for `(messages, model)`.
    ///
    /// The digest covers a canonical JSON document with fixed field order, so
    /// the result depends on nothing but the roles, contents, message order and
    /// the model string.
    pub fn generate(messages: &[Message], model: &str) -> Self {
        #[derive(Serialize)]
        struct KeyMaterial<'a> {
            messages: &'a [Message],
            model: &'a str,
        }

        let canonical =
            serde_json::to_vec(&KeyMaterial { messages, model }).unwrap_or_default();
        let mut hasher = Sha256::new();
        hasher.update(&canonical);
        let hash: String = hasher
            .finalize()
            .iter()
            .map(|b| format!("{:02x}", b))
            .collect();
        Self { hash }
    }

    pub fn as_str(&self) -> &str {
        &self.hash
    }

    /// Truncated form for log fields.
    pub fn short(&self) -> &str {
        let end = self.hash.len().min(LOGGED_KEY_LEN);
        &self.hash[..end]
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.hash)
    }
}

impl From<&str> for CacheKey {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for CacheKey {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}
