use thiserror::Error;

/// Structured error type shared by every stage of the rewrite pipeline.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RewriteError {
    /// Document host read or write failure.
    #[error("Document error: {0}")]
    Document(String),

    /// Search text exceeds the host's single-search length limit.
    #[error("Search text too long ({len} chars, max {max})")]
    SearchTooLong { len: usize, max: usize },

    /// A cached paragraph index no longer matches the live document.
    #[error("Paragraph {index} is stale: {reason}")]
    StaleParagraph { index: usize, reason: String },

    /// Network, HTTP status or body parse failure from the LLM endpoint (retryable).
    #[error("Transport error: {0}")]
    Transport(String),

    /// Transport exhausted or response unusable for a rewrite.
    #[error("Generation failed: {0}")]
    Generation(String),

    /// Caller error (bad index, nothing to apply, etc.).
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Options could not be parsed.
    #[error("Config error: {0}")]
    Config(String),
}

impl RewriteError {
    /// Whether [`crate::api::llm::GenerateEndpointTransport`] retries after this error.
    pub fn is_retryable(&self) -> bool {
        matches!(self, RewriteError::Transport(_))
    }
}

pub type Result<T> = std::result::Result<T, RewriteError>;
