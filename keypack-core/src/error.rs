//! Error types for Keypack

use thiserror::Error;

/// Result type alias for Keypack operations
pub type Result<T> = std::result::Result<T, PackError>;

/// Keypack error types
#[derive(Error, Debug)]
pub enum PackError {
    /// A single-blob codec was handed the wrong number of encoded records
    #[error("Malformed input for {codec}: expected {expected} encoded record(s), got {actual}")]
    MalformedInput {
        codec: &'static str,
        expected: usize,
        actual: usize,
    },

    /// Truncated or invalid encoded stream
    #[error("Corrupt encoding: {0}")]
    CorruptEncoding(String),

    /// The generic compression backend failed
    #[error("Compression backend failure in {codec} (batch of {batch_len}): {source}")]
    Backend {
        codec: &'static str,
        batch_len: usize,
        #[source]
        source: std::io::Error,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PackError {
    pub(crate) fn corrupt(msg: impl Into<String>) -> Self {
        PackError::CorruptEncoding(msg.into())
    }

    pub(crate) fn backend(codec: &'static str, batch_len: usize, source: std::io::Error) -> Self {
        PackError::Backend {
            codec,
            batch_len,
            source,
        }
    }

    /// Check if error is retryable
    ///
    /// Codec input is deterministic, so only plain IO failures qualify.
    pub fn is_retryable(&self) -> bool {
        matches!(self, PackError::Io(_))
    }

    /// Check if error indicates a structurally broken batch
    pub fn is_corruption(&self) -> bool {
        matches!(
            self,
            PackError::CorruptEncoding(_) | PackError::MalformedInput { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        let err = PackError::MalformedInput {
            codec: "Deflate",
            expected: 1,
            actual: 3,
        };
        assert!(err.is_corruption());
        assert!(!err.is_retryable());
        assert_eq!(
            err.to_string(),
            "Malformed input for Deflate: expected 1 encoded record(s), got 3"
        );

        let err = PackError::backend(
            "Deflate",
            12,
            std::io::Error::new(std::io::ErrorKind::InvalidData, "bad header"),
        );
        assert!(!err.is_corruption());
        assert!(err.to_string().contains("batch of 12"));
    }
}
