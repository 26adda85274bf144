//! Client-side error types.
//!
//! Nothing in the client pipeline is fatal: a failed sweep leaves the last
//! committed render state in place and can be retried.

use std::path::PathBuf;

use crate::db::RepositoryError;

/// A single page request failed.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FetchError {
    /// Connection refused, timeout, reset, or an unreachable repository.
    #[error("transport failure: {0}")]
    Transport(String),

    /// The server answered with a non-success status.
    #[error("server returned HTTP {status}: {message}")]
    Status { status: u16, message: String },

    /// The body was not a facility page.
    #[error("malformed page: {0}")]
    Decode(String),
}

impl From<RepositoryError> for FetchError {
    fn from(err: RepositoryError) -> Self {
        FetchError::Transport(err.to_string())
    }
}

/// A sweep was aborted because one of its pages failed.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("sweep {generation} failed at offset {offset}: {source}")]
pub struct SweepError {
    pub generation: u64,
    /// Offset of the page that failed.
    pub offset: u64,
    #[source]
    pub source: FetchError,
}

impl SweepError {
    /// Sweep failures never poison state, so they can always be retried.
    pub fn is_retryable(&self) -> bool {
        true
    }
}

/// Invalid or unreadable client configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse map config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid map config: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_sweep_error_exposes_source() {
        let err = SweepError {
            generation: 4,
            offset: 2000,
            source: FetchError::Status {
                status: 503,
                message: "unavailable".into(),
            },
        };
        assert!(err.is_retryable());
        assert!(err.to_string().contains("sweep 4"));
        assert!(err.source().is_some());
    }

    #[test]
    fn test_repository_errors_become_transport_failures() {
        let err = FetchError::from(RepositoryError::connection("pool exhausted"));
        assert!(matches!(err, FetchError::Transport(msg) if msg.contains("pool exhausted")));
    }
}
