//! The git-backed encrypted mailbox.
//!
//! Each message is sealed on its own, written to its date-partitioned path
//! and committed. A single store-wide lock serialises every operation: the
//! write / stage / commit sequence is not atomic, and two writers
//! interleaving would let one commit pick up the other's half-written file.
//! This caps throughput at one operation at a time, reads included.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use mailvault_shared::{EncryptedMessage, Encryptor, Message, MessageStatus};
use serde_json::json;
use tokio::sync::Mutex;
use tracing::{info, warn};
use walkdir::WalkDir;

use crate::config::StorageConfig;
use crate::error::{Result, StoreError};
use crate::events::{
    emit_event, SharedSink, EVENT_MESSAGE_STATUS_UPDATED, EVENT_MESSAGE_STORED, EVENT_PUSH_FAILED,
};
use crate::git::GitDriver;
use crate::layout::{validate_id, IdMatch, MessageLayout};

pub struct MessageStore {
    layout: MessageLayout,
    git: Arc<GitDriver>,
    encryptor: Encryptor,
    push_on_write: bool,
    lock: Mutex<()>,
    events: SharedSink,
}

impl std::fmt::Debug for MessageStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageStore")
            .field("root", &self.layout.root())
            .field("push_on_write", &self.push_on_write)
            .finish_non_exhaustive()
    }
}

impl MessageStore {
    /// Validate `config`, initialise the repository if needed and commit any
    /// records an interrupted write left behind.
    pub async fn open(config: StorageConfig, events: SharedSink) -> Result<Self> {
        config.validate()?;
        let encryptor = Encryptor::new(&config.encryption_key)?;

        let store = Self {
            layout: MessageLayout::new(&config.repo_path),
            git: Arc::new(GitDriver::new(&config)),
            encryptor,
            push_on_write: config.push_on_write,
            lock: Mutex::new(()),
            events,
        };

        let created = store.git.init_repository().await?;
        if !created {
            store.reconcile().await?;
        }

        Ok(store)
    }

    pub fn layout(&self) -> &MessageLayout {
        &self.layout
    }

    pub fn git(&self) -> &GitDriver {
        &self.git
    }

    /// Encrypt, write and commit a new message.
    pub async fn save_message(&self, message: &Message) -> Result<()> {
        let _guard = self.lock.lock().await;

        let path = self.layout.message_path(&message.id, &message.timestamp)?;
        let commit_msg = format!("Add message {} from {}", message.id, message.name);
        let rel = self.write_record(&path, message, &commit_msg).await?;

        emit_event(
            &self.events,
            EVENT_MESSAGE_STORED,
            json!({ "message_id": message.id, "path": rel.to_string_lossy() }),
        );
        info!(id = %message.id, path = %rel.display(), "Saved message");
        Ok(())
    }

    pub async fn get_message(&self, id: &str) -> Result<Message> {
        let _guard = self.lock.lock().await;

        let path = self.find(id).await?;
        self.read_record(&path).await
    }

    /// Every readable message, newest first, optionally filtered by status.
    /// Records that cannot be read or decrypted are logged and skipped.
    pub async fn list_messages(&self, status: Option<MessageStatus>) -> Result<Vec<Message>> {
        let _guard = self.lock.lock().await;

        let mut messages = Vec::new();
        for path in self.record_files().await? {
            let message = match self.read_record(&path).await {
                Ok(message) => message,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Skipping unreadable message");
                    continue;
                }
            };

            if status.map_or(true, |s| message.status == s) {
                messages.push(message);
            }
        }

        messages.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(messages)
    }

    /// Rewrite a message with a new status at its existing path. Every call
    /// produces a fresh nonce and a new commit.
    pub async fn update_status(&self, id: &str, status: MessageStatus) -> Result<()> {
        let _guard = self.lock.lock().await;

        let path = self.find(id).await?;
        let mut message = self.read_record(&path).await?;
        message.status = status;

        let commit_msg = format!("Update message {} status to {}", message.id, status);
        let rel = self.write_record(&path, &message, &commit_msg).await?;

        emit_event(
            &self.events,
            EVENT_MESSAGE_STORED,
            json!({ "message_id": message.id, "path": rel.to_string_lossy() }),
        );
        emit_event(
            &self.events,
            EVENT_MESSAGE_STATUS_UPDATED,
            json!({ "message_id": message.id, "status": status.as_str() }),
        );
        info!(id = %message.id, %status, "Updated message status");
        Ok(())
    }

    /// Push now and wait for the result. A failure is also published as
    /// `message.push_failed`.
    pub async fn push(&self) -> Result<()> {
        let _guard = self.lock.lock().await;
        push_and_report(&self.git, &self.events).await
    }

    /// Commit record files left on disk by a write that never reached its
    /// commit, and drop stale temporary files. Returns how many records were
    /// committed.
    pub async fn reconcile(&self) -> Result<usize> {
        let _guard = self.lock.lock().await;

        let messages_dir = self.layout.messages_dir();
        let stale = tokio::task::spawn_blocking(move || stale_temp_files(&messages_dir))
            .await
            .map_err(|e| StoreError::io("temp file scan failed", std::io::Error::other(e)))?;
        for tmp in stale {
            warn!(path = %tmp.display(), "Removing stale temporary file");
            tokio::fs::remove_file(&tmp)
                .await
                .map_err(|e| StoreError::io("failed to remove stale temporary file", e))?;
        }

        let pending = self.git.uncommitted_records().await?;
        if pending.is_empty() {
            return Ok(0);
        }

        for rel in &pending {
            self.git.add(rel).await?;
        }
        self.git
            .commit(&format!("Reconcile {} uncommitted message(s)", pending.len()))
            .await?;

        warn!(count = pending.len(), "Committed messages left over from an interrupted write");
        Ok(pending.len())
    }

    // ---------------------------------------------------------------------
    // Internals. Callers hold `self.lock`.
    // ---------------------------------------------------------------------

    /// Encrypt `message` into `path` and commit it. Returns the path relative
    /// to the repository root.
    async fn write_record(&self, path: &Path, message: &Message, commit_msg: &str) -> Result<PathBuf> {
        let encrypted = self.encryptor.encrypt(message)?;
        let data = serde_json::to_vec_pretty(&encrypted).map_err(|source| StoreError::Envelope {
            action: "marshal",
            path: path.to_path_buf(),
            source,
        })?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StoreError::io("failed to create directory", e))?;
        }

        // Write beside the target and rename so a reader never sees a
        // truncated record.
        let tmp = temp_path(path);
        tokio::fs::write(&tmp, &data)
            .await
            .map_err(|e| StoreError::io("failed to write encrypted message", e))?;
        tokio::fs::rename(&tmp, path)
            .await
            .map_err(|e| StoreError::io("failed to write encrypted message", e))?;

        let rel = self.layout.relative(path);
        self.git.add(&rel).await?;
        self.git.commit(commit_msg).await?;

        if self.push_on_write && self.git.has_remote() {
            let git = Arc::clone(&self.git);
            let events = self.events.clone();
            tokio::spawn(async move {
                let _ = push_and_report(&git, &events).await;
            });
        }

        Ok(rel)
    }

    async fn read_record(&self, path: &Path) -> Result<Message> {
        let data = tokio::fs::read(path)
            .await
            .map_err(|e| StoreError::io("failed to read message file", e))?;

        let encrypted: EncryptedMessage =
            serde_json::from_slice(&data).map_err(|source| StoreError::Envelope {
                action: "unmarshal",
                path: path.to_path_buf(),
                source,
            })?;

        Ok(self.encryptor.decrypt(&encrypted)?)
    }

    /// Linear scan for the record of `id`, preferring an exact
    /// `_<id>.json.enc` suffix over a substring hit.
    async fn find(&self, id: &str) -> Result<PathBuf> {
        validate_id(id)?;

        let mut partial = None;
        for path in self.record_files().await? {
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            match MessageLayout::match_id(name, id) {
                IdMatch::Exact => return Ok(path),
                IdMatch::Partial if partial.is_none() => partial = Some(path),
                _ => {}
            }
        }

        partial.ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    async fn record_files(&self) -> Result<Vec<PathBuf>> {
        let messages_dir = self.layout.messages_dir();
        tokio::task::spawn_blocking(move || walk_records(&messages_dir))
            .await
            .map_err(|e| StoreError::io("message scan failed", std::io::Error::other(e)))?
    }
}

async fn push_and_report(git: &GitDriver, events: &SharedSink) -> Result<()> {
    let result = git.push().await;
    if let Err(e) = &result {
        emit_event(
            events,
            EVENT_PUSH_FAILED,
            json!({ "branch": git.branch(), "error": e.to_string() }),
        );
    }
    result
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

/// All record files under `dir`, in file-name order.
fn walk_records(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.map_err(|e| StoreError::io("failed to search for messages", e.into()))?;
        let is_record = entry
            .file_name()
            .to_str()
            .is_some_and(MessageLayout::is_record);
        if entry.file_type().is_file() && is_record {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

fn stale_temp_files(dir: &Path) -> Vec<PathBuf> {
    WalkDir::new(dir)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| {
            entry
                .file_name()
                .to_str()
                .is_some_and(|name| name.ends_with(".json.enc.tmp"))
        })
        .map(|entry| entry.into_path())
        .collect()
}
