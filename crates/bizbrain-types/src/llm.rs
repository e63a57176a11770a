//! Failure type shared by language-model client implementations.

use thiserror::Error;

/// Errors surfaced by an `LlmClient`.
///
/// The engine maps every variant to a retryable execution error; the
/// distinction only matters for logs.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("provider error: {message}")]
    Provider { message: String },

    #[error("rate limited{}", .retry_after_ms.map(|ms| format!(", retry after {ms}ms")).unwrap_or_default())]
    RateLimited { retry_after_ms: Option<u64> },

    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("operation not supported: {0}")]
    Unsupported(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limited_display() {
        let err = LlmError::RateLimited {
            retry_after_ms: Some(1500),
        };
        assert_eq!(err.to_string(), "rate limited, retry after 1500ms");

        let err = LlmError::RateLimited {
            retry_after_ms: None,
        };
        assert_eq!(err.to_string(), "rate limited");
    }
}
