use aes_gcm::{aead::Aead, Aes256Gcm, KeyInit, Nonce};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use rand::RngCore;
use zeroize::Zeroizing;

use crate::constants::{FORMAT_VERSION, KEY_HEX_LEN, NONCE_SIZE, SYMMETRIC_KEY_SIZE};
use crate::error::CryptoError;
use crate::types::{format_created_at, EncryptedMessage, Message};

pub type SymmetricKey = [u8; SYMMETRIC_KEY_SIZE];

/// Fresh key from the OS CSPRNG.
pub fn generate_key() -> SymmetricKey {
    let mut key = [0u8; SYMMETRIC_KEY_SIZE];
    rand::rngs::OsRng.fill_bytes(&mut key);
    key
}

pub fn generate_nonce() -> [u8; NONCE_SIZE] {
    let mut nonce = [0u8; NONCE_SIZE];
    rand::rngs::OsRng.fill_bytes(&mut nonce);
    nonce
}

/// Parse the operator key format: exactly 64 hex characters.
pub fn parse_hex_key(input: &str) -> Result<SymmetricKey, CryptoError> {
    let input = input.trim();
    if input.len() != KEY_HEX_LEN {
        return Err(CryptoError::InvalidHexKey(format!(
            "expected {} hex chars, got {}",
            KEY_HEX_LEN,
            input.len()
        )));
    }

    let bytes = Zeroizing::new(
        hex::decode(input).map_err(|e| CryptoError::InvalidHexKey(e.to_string()))?,
    );
    let mut key = [0u8; SYMMETRIC_KEY_SIZE];
    key.copy_from_slice(&bytes);
    Ok(key)
}

/// Per-record AES-256-GCM codec for contact messages.
///
/// Every call to [`Encryptor::encrypt`] draws a new random nonce, so
/// re-encrypting the same message never reuses one under this key. The key
/// is wiped from memory when the codec (or any clone of it) is dropped.
#[derive(Clone)]
pub struct Encryptor {
    key: Zeroizing<SymmetricKey>,
}

impl std::fmt::Debug for Encryptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Encryptor").field("key", &"<redacted>").finish()
    }
}

impl Encryptor {
    pub fn new(key: &[u8]) -> Result<Self, CryptoError> {
        if key.len() != SYMMETRIC_KEY_SIZE {
            return Err(CryptoError::InvalidKeyLength(key.len()));
        }

        let mut bytes = Zeroizing::new([0u8; SYMMETRIC_KEY_SIZE]);
        bytes.copy_from_slice(key);
        Ok(Self { key: bytes })
    }

    fn cipher(&self) -> Result<Aes256Gcm, CryptoError> {
        Aes256Gcm::new_from_slice(self.key.as_slice()).map_err(|_| CryptoError::CipherInit)
    }

    pub fn encrypt(&self, message: &Message) -> Result<EncryptedMessage, CryptoError> {
        let plaintext = serde_json::to_vec(message).map_err(|source| {
            CryptoError::Serialization {
                action: "marshal",
                source,
            }
        })?;

        let cipher = self.cipher()?;
        let nonce_bytes = generate_nonce();
        let ciphertext = cipher
            .encrypt(Nonce::from_slice(&nonce_bytes), plaintext.as_slice())
            .map_err(|_| CryptoError::EncryptionFailed)?;

        Ok(EncryptedMessage {
            id: message.id.clone(),
            ciphertext: STANDARD.encode(ciphertext),
            nonce: STANDARD.encode(nonce_bytes),
            created_at: format_created_at(&message.timestamp),
            version: FORMAT_VERSION.to_string(),
        })
    }

    pub fn decrypt(&self, encrypted: &EncryptedMessage) -> Result<Message, CryptoError> {
        let ciphertext = STANDARD
            .decode(&encrypted.ciphertext)
            .map_err(|source| CryptoError::InvalidEncoding {
                field: "ciphertext",
                source,
            })?;
        let nonce_bytes = STANDARD
            .decode(&encrypted.nonce)
            .map_err(|source| CryptoError::InvalidEncoding {
                field: "nonce",
                source,
            })?;

        // A nonce of the wrong size can never authenticate.
        if nonce_bytes.len() != NONCE_SIZE {
            return Err(CryptoError::DecryptionFailed);
        }

        let cipher = self.cipher()?;
        let plaintext = cipher
            .decrypt(Nonce::from_slice(&nonce_bytes), ciphertext.as_slice())
            .map_err(|_| CryptoError::DecryptionFailed)?;

        serde_json::from_slice(&plaintext).map_err(|source| CryptoError::Serialization {
            action: "unmarshal",
            source,
        })
    }
}
