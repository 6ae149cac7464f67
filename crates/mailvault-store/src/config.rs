//! Storage configuration loaded from environment variables.
//!
//! Everything except the encryption key has a default, so a development
//! checkout only needs `GIT_ENCRYPTION_KEY` set.

use std::path::PathBuf;
use std::time::Duration;

use mailvault_shared::constants::SYMMETRIC_KEY_SIZE;
use mailvault_shared::parse_hex_key;
use zeroize::Zeroizing;

use crate::error::{Result, StoreError};

/// Configuration of the git-backed message store. Immutable once the store
/// has been constructed.
#[derive(Clone)]
pub struct StorageConfig {
    /// Root of the git repository holding the encrypted records.
    /// Env: `GIT_REPO_PATH`
    /// Default: `./data/messages`
    pub repo_path: PathBuf,

    /// Remote registered as `origin` on first init and used for pushes.
    /// Env: `GIT_REMOTE_URL`
    /// Default: none (no replication).
    pub remote_url: Option<String>,

    /// Branch the repository commits to and pushes.
    /// Env: `GIT_BRANCH`
    /// Default: `main`
    pub branch: String,

    /// Commit identity written into the repository config on first init.
    /// Env: `GIT_COMMIT_AUTHOR` / `GIT_COMMIT_EMAIL`
    pub commit_author: String,
    pub commit_email: String,

    /// Raw 32-byte AES-256 key, wiped on drop.
    /// Env: `GIT_ENCRYPTION_KEY` (64 hex chars)
    pub encryption_key: Zeroizing<Vec<u8>>,

    /// Push in the background after every successful commit.
    /// Env: `GIT_PUSH_ON_WRITE` (true/false)
    /// Default: `false`
    pub push_on_write: bool,

    /// Upper bound for a single git subprocess.
    /// Env: `GIT_COMMAND_TIMEOUT_SECS`
    /// Default: `30`
    pub command_timeout: Duration,
}

impl std::fmt::Debug for StorageConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageConfig")
            .field("repo_path", &self.repo_path)
            .field("remote_url", &self.remote_url)
            .field("branch", &self.branch)
            .field("commit_author", &self.commit_author)
            .field("commit_email", &self.commit_email)
            .field("encryption_key", &"<redacted>")
            .field("push_on_write", &self.push_on_write)
            .field("command_timeout", &self.command_timeout)
            .finish()
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            repo_path: PathBuf::from("./data/messages"),
            remote_url: None,
            branch: "main".to_string(),
            commit_author: "Mailvault Bot".to_string(),
            commit_email: "bot@mailvault.local".to_string(),
            encryption_key: Zeroizing::new(Vec::new()),
            push_on_write: false,
            command_timeout: Duration::from_secs(30),
        }
    }
}

impl StorageConfig {
    /// Config for `repo_path` with the given key and defaults elsewhere.
    pub fn new(repo_path: impl Into<PathBuf>, encryption_key: impl Into<Vec<u8>>) -> Self {
        Self {
            repo_path: repo_path.into(),
            encryption_key: Zeroizing::new(encryption_key.into()),
            ..Self::default()
        }
    }

    /// Build configuration from environment variables, falling back to
    /// defaults for anything unset. The key is mandatory.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(path) = lookup("GIT_REPO_PATH").filter(|v| !v.is_empty()) {
            config.repo_path = PathBuf::from(path);
        }

        let key_hex = lookup("GIT_ENCRYPTION_KEY")
            .filter(|v| !v.is_empty())
            .ok_or_else(|| StoreError::Validation("encryption key is required".to_string()))?;
        let key = Zeroizing::new(parse_hex_key(&key_hex)?);
        config.encryption_key = Zeroizing::new(key.to_vec());

        if let Some(url) = lookup("GIT_REMOTE_URL").filter(|v| !v.is_empty()) {
            config.remote_url = Some(url);
        }

        if let Some(val) = lookup("GIT_PUSH_ON_WRITE") {
            config.push_on_write = matches!(val.as_str(), "true" | "1" | "yes");
        }

        if let Some(branch) = lookup("GIT_BRANCH").filter(|v| !v.is_empty()) {
            config.branch = branch;
        }

        if let Some(author) = lookup("GIT_COMMIT_AUTHOR").filter(|v| !v.is_empty()) {
            config.commit_author = author;
        }

        if let Some(email) = lookup("GIT_COMMIT_EMAIL").filter(|v| !v.is_empty()) {
            config.commit_email = email;
        }

        if let Some(val) = lookup("GIT_COMMAND_TIMEOUT_SECS") {
            match val.parse::<u64>() {
                Ok(secs) if secs > 0 => config.command_timeout = Duration::from_secs(secs),
                _ => {
                    return Err(StoreError::Validation(format!(
                        "GIT_COMMAND_TIMEOUT_SECS must be a positive integer, got {val:?}"
                    )))
                }
            }
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.repo_path.as_os_str().is_empty() {
            return Err(StoreError::Validation("repo path is required".to_string()));
        }
        if self.encryption_key.is_empty() {
            return Err(StoreError::Validation("encryption key is required".to_string()));
        }
        if self.encryption_key.len() != SYMMETRIC_KEY_SIZE {
            return Err(StoreError::Validation(format!(
                "encryption key must be {} bytes, got {}",
                SYMMETRIC_KEY_SIZE,
                self.encryption_key.len()
            )));
        }
        if self.branch.is_empty() {
            return Err(StoreError::Validation("branch is required".to_string()));
        }
        Ok(())
    }
}
