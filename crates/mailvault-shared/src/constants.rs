/// On-disk record format version (AES-256-GCM, base64 fields)
pub const FORMAT_VERSION: &str = "1.0";

/// AES-256-GCM nonce size in bytes
pub const NONCE_SIZE: usize = 12;

/// Symmetric key size in bytes (for AES-256-GCM)
pub const SYMMETRIC_KEY_SIZE: usize = 32;

/// Hex-encoded key length accepted by the operator tools
pub const KEY_HEX_LEN: usize = SYMMETRIC_KEY_SIZE * 2;

/// Top-level directory holding all encrypted records
pub const MESSAGES_DIR: &str = "messages";

/// File extension of an encrypted record
pub const RECORD_SUFFIX: &str = ".json.enc";

/// Timestamp segment of a record file name (hyphens, never colons)
pub const RECORD_TIME_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

/// Environment variable the operator tools read the hex key from
pub const KEY_ENV_VAR: &str = "MESSAGE_ENCRYPTION_KEY";
