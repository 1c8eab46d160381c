//! Collaborator trait

use thiserror::Error;

/// Result type for collaborator calls.
pub type CollabResult<T> = Result<T, CollabError>;

#[derive(Debug, Error)]
pub enum CollabError {
    #[error("request failed: {0}")]
    RequestFailed(String),

    #[error("authentication failed: {0}")]
    AuthFailed(String),

    #[error("rate limited: retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("no scripted response left")]
    Exhausted,

    #[error("network error: {0}")]
    NetworkError(#[from] reqwest::Error),
}

/// The external language-model collaborator.
///
/// `reset_history` asks the collaborator to forget any conversational
/// state it keeps on its side before answering. The call may have
/// unbounded latency; callers cancel cooperatively at cycle boundaries,
/// never mid-call.
#[async_trait::async_trait]
pub trait Collaborator: Send + Sync {
    fn name(&self) -> &str;

    async fn generate(&self, prompt: &str, reset_history: bool) -> CollabResult<String>;
}
