use std::time::Duration;

/// Error kinds shared across the platform.
///
/// Every layer maps its failures onto one of these before they cross a
/// component boundary, so callers (HTTP surface, event handlers, the agent
/// loop) can decide retry-vs-surface without knowing the layer underneath.
#[derive(Clone, Debug, thiserror::Error)]
pub enum CoreError {
    /// Rejected input: bounds, enums, missing required fields.
    /// The message is safe to surface verbatim.
    #[error("{0}")]
    Validation(String),

    /// Missing or invalid credential. No hint about which part failed.
    #[error("invalid credentials")]
    Unauthorized,

    /// Target does not exist or is not owned by the caller.
    /// The two cases are deliberately indistinguishable.
    #[error("not found")]
    NotFound,

    /// Optimistic-conflict or uniqueness violation after retries.
    #[error("conflict: {0}")]
    Conflict(String),

    /// A dependency (store, bus, LLM, email) returned a retryable failure.
    #[error("upstream unavailable: {0}")]
    UpstreamTransient(String),

    /// A dependency rejected the request permanently.
    #[error("upstream rejected request: {0}")]
    UpstreamPermanent(String),

    /// Deadline reached before the work completed.
    #[error("deadline exceeded after {0:?}")]
    DeadlineExceeded(Duration),
}

impl CoreError {
    /// True when the caller may retry and expect a different outcome.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Conflict(_) | Self::UpstreamTransient(_) | Self::DeadlineExceeded(_)
        )
    }

    /// Short classification string for logging and metrics.
    pub fn error_kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::Unauthorized => "unauthorized",
            Self::NotFound => "not_found",
            Self::Conflict(_) => "conflict",
            Self::UpstreamTransient(_) => "upstream_transient",
            Self::UpstreamPermanent(_) => "upstream_permanent",
            Self::DeadlineExceeded(_) => "deadline_exceeded",
        }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}
