use thiserror::Error;

/// Result type for artifact operations
pub type ArtifactResult<T> = Result<T, ArtifactError>;

/// Errors that can occur on the upload and download paths
#[derive(Error, Debug)]
pub enum ArtifactError {
    #[error("Artifact not found: {key}")]
    NotFound { key: String },

    #[error("No body provided")]
    MissingBody,

    #[error("Missing checksum")]
    MissingChecksum,

    #[error("Checksum mismatch: expected {expected}, computed {actual}")]
    ChecksumMismatch { expected: String, actual: String },

    #[error("Artifact exceeds maximum size of {limit} bytes")]
    TooLarge { limit: u64 },

    #[error("Invalid artifact key {key}: {reason}")]
    InvalidKey { key: String, reason: String },

    #[error("Storage backend error: {source}")]
    Backend {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    #[error("Serialization error: {source}")]
    Serialization {
        #[from]
        source: serde_json::Error,
    },
}

impl ArtifactError {
    /// Create a backend error from any error type
    pub fn backend<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Backend {
            source: Box::new(error),
        }
    }

    /// Create a not found error
    pub fn not_found<S: Into<String>>(key: S) -> Self {
        Self::NotFound { key: key.into() }
    }

    /// Create an invalid key error
    pub fn invalid_key<K: Into<String>, R: Into<String>>(key: K, reason: R) -> Self {
        Self::InvalidKey {
            key: key.into(),
            reason: reason.into(),
        }
    }

    /// Expected outcomes of a request, as opposed to faults of the service or its backends
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::NotFound { .. }
                | Self::MissingBody
                | Self::MissingChecksum
                | Self::ChecksumMismatch { .. }
                | Self::TooLarge { .. }
                | Self::InvalidKey { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_errors_are_expected_outcomes() {
        assert!(ArtifactError::MissingBody.is_client_error());
        assert!(ArtifactError::not_found("a/b/c").is_client_error());
        assert!(ArtifactError::invalid_key("../x", "dot segment").is_client_error());
        assert!(!ArtifactError::from(std::io::Error::other("disk")).is_client_error());
    }
}
