use std::path::PathBuf;

use mailvault_shared::{CryptoError, ErrorKind, InvalidStatus};
use thiserror::Error;

/// Errors produced by the store layer.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Malformed configuration or caller input.
    #[error("Invalid input: {0}")]
    Validation(String),

    /// No record file matches the identifier.
    #[error("Message not found: {0}")]
    NotFound(String),

    /// Filesystem failure, with the operation that failed.
    #[error("IO error: {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    /// A git subprocess exited non-zero. `output` is its combined output.
    #[error("git {command} failed: {output}")]
    Git { command: String, output: String },

    /// A git subprocess exceeded the configured timeout and was killed.
    #[error("git {command} timed out after {secs}s")]
    GitTimeout { command: String, secs: u64 },

    /// The encrypted envelope on disk is not valid JSON.
    #[error("Failed to {action} encrypted message {path}: {source}")]
    Envelope {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Codec failure (decryption, bad base64, bad plaintext JSON, bad key).
    #[error(transparent)]
    Crypto(#[from] CryptoError),
}

impl StoreError {
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        StoreError::Io {
            context: context.into(),
            source,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            StoreError::Validation(_) => ErrorKind::Validation,
            StoreError::NotFound(_) => ErrorKind::NotFound,
            StoreError::Io { .. } | StoreError::Git { .. } | StoreError::GitTimeout { .. } => {
                ErrorKind::Io
            }
            StoreError::Envelope { .. } => ErrorKind::Serialization,
            StoreError::Crypto(e) => e.kind(),
        }
    }
}

impl From<InvalidStatus> for StoreError {
    fn from(e: InvalidStatus) -> Self {
        StoreError::Validation(e.to_string())
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_kinds_follow_taxonomy() {
        assert_eq!(StoreError::NotFound("x".into()).kind(), ErrorKind::NotFound);
        assert_eq!(
            StoreError::Git {
                command: "commit".into(),
                output: "nothing to commit".into()
            }
            .kind(),
            ErrorKind::Io
        );
        assert_eq!(
            StoreError::from(CryptoError::DecryptionFailed).kind(),
            ErrorKind::Decryption
        );
        assert_eq!(
            StoreError::from(InvalidStatus("bogus".into())).kind(),
            ErrorKind::Validation
        );
    }

    #[test]
    fn test_io_keeps_root_cause() {
        let err = StoreError::io(
            "failed to read message file",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(err.to_string().contains("failed to read message file"));
        let source = err.source().expect("source");
        assert_eq!(source.to_string(), "denied");
    }

    #[test]
    fn test_git_error_carries_output() {
        let err = StoreError::Git {
            command: "add".into(),
            output: "fatal: pathspec 'x' did not match".into(),
        };
        assert!(err.to_string().contains("pathspec"));
    }
}
