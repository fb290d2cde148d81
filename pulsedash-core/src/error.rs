//! Structured error types for source adapters.
//!
//! Adapters convert every lower-level fault (HTTP client, JSON decoding,
//! timestamp parsing) into a `FetchError`. These are displayable in the
//! status bar and error overlay as-is.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FetchError {
    #[error("request timed out after {timeout_secs}s: {url}")]
    Timeout { url: String, timeout_secs: u64 },

    #[error("network unreachable: {0}")]
    Network(String),

    #[error("HTTP {status} from {url}")]
    HttpStatus { status: u16, url: String },

    #[error("rate limited by provider (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("provider blocked: circuit breaker open for another {remaining_secs}s")]
    CircuitOpen { remaining_secs: u64 },

    #[error("response format changed: {0}")]
    Schema(String),

    #[error("no data points for '{entity}'")]
    EmptyResult { entity: String },

    #[error("invalid parameters: {0}")]
    InvalidParameters(String),
}

/// Coarse failure taxonomy shown next to each error.
///
/// `Computation` is never produced by an adapter: degenerate statistics are
/// reported as "not available" values rather than errors. It exists so the
/// UI can label its own numeric problems consistently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    Network,
    Schema,
    EmptyResult,
    Computation,
    Parameters,
}

impl ErrorKind {
    pub fn label(self) -> &'static str {
        match self {
            ErrorKind::Network => "NET",
            ErrorKind::Schema => "SCHEMA",
            ErrorKind::EmptyResult => "EMPTY",
            ErrorKind::Computation => "CALC",
            ErrorKind::Parameters => "PARAM",
        }
    }
}

impl FetchError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            FetchError::Timeout { .. }
            | FetchError::Network(_)
            | FetchError::HttpStatus { .. }
            | FetchError::RateLimited { .. }
            | FetchError::CircuitOpen { .. } => ErrorKind::Network,
            FetchError::Schema(_) => ErrorKind::Schema,
            FetchError::EmptyResult { .. } => ErrorKind::EmptyResult,
            FetchError::InvalidParameters(_) => ErrorKind::Parameters,
        }
    }

    /// Convert a reqwest failure, distinguishing timeouts from other
    /// transport errors.
    pub fn from_transport(err: &reqwest::Error, url: &str, timeout_secs: u64) -> Self {
        if err.is_timeout() {
            FetchError::Timeout {
                url: url.to_string(),
                timeout_secs,
            }
        } else {
            FetchError::Network(format!("{url}: {err}"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_fold_into_taxonomy() {
        assert_eq!(
            FetchError::RateLimited { retry_after_secs: 60 }.kind(),
            ErrorKind::Network
        );
        assert_eq!(
            FetchError::HttpStatus {
                status: 500,
                url: "x".into()
            }
            .kind(),
            ErrorKind::Network
        );
        assert_eq!(FetchError::Schema("x".into()).kind(), ErrorKind::Schema);
        assert_eq!(
            FetchError::EmptyResult { entity: "btc".into() }.kind(),
            ErrorKind::EmptyResult
        );
    }

    #[test]
    fn messages_are_human_readable() {
        let e = FetchError::EmptyResult {
            entity: "bitcoin".into(),
        };
        assert_eq!(e.to_string(), "no data points for 'bitcoin'");
    }
}
