//! # mailvault-shared
//!
//! Record types and the per-record encryption codec shared by the message
//! store and the operator tools.
//!
//! Messages are sealed individually with AES-256-GCM so that the git history
//! holding them never contains plaintext.

pub mod constants;
pub mod crypto;
pub mod error;
pub mod types;

pub use crypto::{generate_key, parse_hex_key, Encryptor, SymmetricKey};
pub use error::{CryptoError, ErrorKind, InvalidStatus};
pub use types::{EncryptedMessage, Message, MessageStatus};
