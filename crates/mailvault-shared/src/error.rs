use thiserror::Error;

/// Coarse classification shared by every error in the workspace.
///
/// Callers branch on the kind; the `source()` chain of the concrete error
/// still carries the root cause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed configuration or input.
    Validation,
    /// No record matches the requested identifier.
    NotFound,
    /// Filesystem or subprocess failure.
    Io,
    /// JSON encode/decode failure on a record or envelope.
    Serialization,
    /// Base64 decode failure on stored ciphertext or nonce.
    InvalidFormat,
    /// Authenticated decryption failed (tampering or wrong key).
    Decryption,
    /// Cipher construction or sealing failure.
    Internal,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ErrorKind::Validation => "validation",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Io => "io",
            ErrorKind::Serialization => "serialization",
            ErrorKind::InvalidFormat => "invalid_format",
            ErrorKind::Decryption => "decryption",
            ErrorKind::Internal => "internal",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug)]
pub enum CryptoError {
    #[error("Invalid key length: encryption key must be 32 bytes for AES-256, got {0}")]
    InvalidKeyLength(usize),

    #[error("Invalid hex key: {0}")]
    InvalidHexKey(String),

    #[error("Failed to create cipher")]
    CipherInit,

    #[error("Encryption failed")]
    EncryptionFailed,

    #[error("Decryption failed: invalid ciphertext or wrong key")]
    DecryptionFailed,

    #[error("Failed to decode {field}: {source}")]
    InvalidEncoding {
        field: &'static str,
        #[source]
        source: base64::DecodeError,
    },

    #[error("Failed to {action} message: {source}")]
    Serialization {
        action: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

impl CryptoError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CryptoError::InvalidKeyLength(_) | CryptoError::InvalidHexKey(_) => {
                ErrorKind::Validation
            }
            CryptoError::CipherInit | CryptoError::EncryptionFailed => ErrorKind::Internal,
            CryptoError::DecryptionFailed => ErrorKind::Decryption,
            CryptoError::InvalidEncoding { .. } => ErrorKind::InvalidFormat,
            CryptoError::Serialization { .. } => ErrorKind::Serialization,
        }
    }
}

/// A status string outside the closed `new | read | replied | closed` set.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid status {0:?}: must be one of new, read, replied, closed")]
pub struct InvalidStatus(pub String);

impl InvalidStatus {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Validation
    }
}
