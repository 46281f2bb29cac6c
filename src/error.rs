use crate::drivers::ProviderKind;
use thiserror::Error;

/// Structured error context for configuration failures.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ErrorContext {
    /// Configuration key that caused the error (e.g., "AI_PRIMARY_PROVIDER", "factory.primary")
    pub field_path: Option<String>,
    /// Additional context about the error (e.g., the rejected value)
    pub details: Option<String>,
    /// Source of the error (e.g., "env", "yaml")
    pub source: Option<String>,
}

impl ErrorContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_field_path(mut self, path: impl Into<String>) -> Self {
        self.field_path = Some(path.into());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

/// How a provider call failed.
///
/// Retry and fallback decisions are made by matching on this enum only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderErrorKind {
    /// The per-request timeout elapsed.
    Timeout,
    /// The vendor throttled the request (HTTP 429).
    RateLimit,
    /// Credentials were rejected (HTTP 401/403). Never retried, never falls back.
    Auth,
    /// The caller cancelled the call. Treated like `Auth`.
    Cancelled,
    /// Anything else. `retriable` is set for server-side (5xx) and network failures.
    Generic { status: Option<u16>, retriable: bool },
}

impl ProviderErrorKind {
    /// Classify an HTTP status returned by a vendor API.
    pub fn from_status(status: u16) -> Self {
        match status {
            401 | 403 => ProviderErrorKind::Auth,
            408 => ProviderErrorKind::Timeout,
            429 => ProviderErrorKind::RateLimit,
            s => ProviderErrorKind::Generic {
                status: Some(s),
                retriable: s >= 500,
            },
        }
    }

    pub fn is_retriable(&self) -> bool {
        match self {
            ProviderErrorKind::Timeout | ProviderErrorKind::RateLimit => true,
            ProviderErrorKind::Auth | ProviderErrorKind::Cancelled => false,
            ProviderErrorKind::Generic { retriable, .. } => *retriable,
        }
    }

    /// Fatal kinds stop both the retry loop and the fallback path.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ProviderErrorKind::Auth | ProviderErrorKind::Cancelled)
    }

    pub fn label(&self) -> &'static str {
        match self {
            ProviderErrorKind::Timeout => "timeout",
            ProviderErrorKind::RateLimit => "rate_limited",
            ProviderErrorKind::Auth => "authentication",
            ProviderErrorKind::Cancelled => "cancelled",
            ProviderErrorKind::Generic { retriable: true, .. } => "server_error",
            ProviderErrorKind::Generic { retriable: false, .. } => "invalid_request",
        }
    }
}

/// Failure reported by a provider adapter. Vendor and transport errors are
/// translated into this type at the adapter boundary.
#[derive(Debug, Error)]
#[error("{provider} {}: {message}", .kind.label())]
pub struct ProviderError {
    pub provider: String,
    pub kind: ProviderErrorKind,
    pub message: String,
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
}

impl ProviderError {
    pub fn new(
        provider: impl Into<String>,
        kind: ProviderErrorKind,
        message: impl Into<String>,
    ) -> Self {
        Self {
            provider: provider.into(),
            kind,
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(
        mut self,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    pub fn timeout(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(provider, ProviderErrorKind::Timeout, message)
    }

    pub fn rate_limit(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(provider, ProviderErrorKind::RateLimit, message)
    }

    pub fn auth(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(provider, ProviderErrorKind::Auth, message)
    }

    pub fn cancelled(provider: impl Into<String>) -> Self {
        Self::new(provider, ProviderErrorKind::Cancelled, "request cancelled by caller")
    }

    /// Vendor answered with a non-success HTTP status.
    pub fn from_status(
        provider: impl Into<String>,
        status: u16,
        message: impl Into<String>,
    ) -> Self {
        Self::new(provider, ProviderErrorKind::from_status(status), message)
    }

    /// Connection-level failure without an HTTP status.
    pub fn network(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(
            provider,
            ProviderErrorKind::Generic {
                status: None,
                retriable: true,
            },
            message,
        )
    }

    /// The vendor answered 2xx but the body could not be interpreted.
    pub fn malformed(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(
            provider,
            ProviderErrorKind::Generic {
                status: None,
                retriable: false,
            },
            message,
        )
    }

    pub fn is_retriable(&self) -> bool {
        self.kind.is_retriable()
    }

    pub fn is_fatal(&self) -> bool {
        self.kind.is_fatal()
    }

    pub fn is_auth(&self) -> bool {
        self.kind == ProviderErrorKind::Auth
    }

    pub fn status(&self) -> Option<u16> {
        match self.kind {
            ProviderErrorKind::Generic { status, .. } => status,
            _ => None,
        }
    }
}

/// Unified error type for the crate.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("All AI providers failed. Last error: {message}")]
    AllProvidersFailed {
        message: String,
        #[source]
        last: ProviderError,
    },

    #[error("AI provider '{0}' is not configured")]
    ProviderNotConfigured(ProviderKind),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Configuration error: {message}{}", format_context(.context))]
    Configuration {
        message: String,
        context: ErrorContext,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration file error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

// Helper function to format error context for display
fn format_context(ctx: &ErrorContext) -> String {
    let mut parts = Vec::new();
    if let Some(ref field) = ctx.field_path {
        parts.push(format!("field: {}", field));
    }
    if let Some(ref details) = ctx.details {
        parts.push(format!("details: {}", details));
    }
    if let Some(ref source) = ctx.source {
        parts.push(format!("source: {}", source));
    }
    if parts.is_empty() {
        String::new()
    } else {
        format!(" ({})", parts.join(", "))
    }
}

impl Error {
    /// Create a new configuration error with structured context
    pub fn configuration_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Configuration {
            message: msg.into(),
            context,
        }
    }

    /// Aggregate failure once every configured provider gave up.
    pub fn all_failed(last: ProviderError) -> Self {
        Error::AllProvidersFailed {
            message: last.to_string(),
            last,
        }
    }

    /// The provider error behind this error, if any.
    pub fn provider_error(&self) -> Option<&ProviderError> {
        match self {
            Error::Provider(e) => Some(e),
            Error::AllProvidersFailed { last, .. } => Some(last),
            _ => None,
        }
    }

    pub fn is_auth(&self) -> bool {
        matches!(self, Error::Provider(e) if e.is_auth())
    }

    pub fn context(&self) -> Option<&ErrorContext> {
        match self {
            Error::Configuration { context, .. } => Some(context),
            _ => None,
        }
    }
}
