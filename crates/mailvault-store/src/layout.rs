//! Content-addressed placement of encrypted records.
//!
//! ```text
//! <repo>/
//!   README.md
//!   messages/
//!     <YYYY>/<MM>/<YYYY-MM-DD_HH-MM-SS>_<id>.json.enc
//! ```
//!
//! The path is a pure function of the message id and its creation time.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use mailvault_shared::constants::{MESSAGES_DIR, RECORD_SUFFIX, RECORD_TIME_FORMAT};

use crate::error::{Result, StoreError};

#[derive(Debug, Clone)]
pub struct MessageLayout {
    root: PathBuf,
}

impl MessageLayout {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Repository root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding every record.
    pub fn messages_dir(&self) -> PathBuf {
        self.root.join(MESSAGES_DIR)
    }

    /// `messages/<YYYY>/<MM>` for the given timestamp.
    pub fn month_dir(&self, timestamp: &DateTime<Utc>) -> PathBuf {
        self.messages_dir()
            .join(timestamp.format("%Y").to_string())
            .join(timestamp.format("%m").to_string())
    }

    /// `<YYYY-MM-DD_HH-MM-SS>_<id>.json.enc`
    pub fn file_name(id: &str, timestamp: &DateTime<Utc>) -> String {
        format!(
            "{}_{}{}",
            timestamp.format(RECORD_TIME_FORMAT),
            id,
            RECORD_SUFFIX
        )
    }

    /// Absolute path of a record. Rejects ids that could leave the month
    /// directory.
    pub fn message_path(&self, id: &str, timestamp: &DateTime<Utc>) -> Result<PathBuf> {
        validate_id(id)?;
        Ok(self.month_dir(timestamp).join(Self::file_name(id, timestamp)))
    }

    /// Path relative to the repository root, as git expects it.
    pub fn relative(&self, path: &Path) -> PathBuf {
        path.strip_prefix(&self.root)
            .map(Path::to_path_buf)
            .unwrap_or_else(|_| path.to_path_buf())
    }

    pub fn is_record(file_name: &str) -> bool {
        file_name.ends_with(RECORD_SUFFIX)
    }

    /// How well a record file name matches `id`.
    pub fn match_id(file_name: &str, id: &str) -> IdMatch {
        if !Self::is_record(file_name) {
            return IdMatch::None;
        }
        let exact = format!("_{id}{RECORD_SUFFIX}");
        if file_name.ends_with(&exact) {
            IdMatch::Exact
        } else if file_name.contains(id) {
            IdMatch::Partial
        } else {
            IdMatch::None
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdMatch {
    None,
    /// The id appears somewhere in the file name.
    Partial,
    /// The file name ends in `_<id>.json.enc`.
    Exact,
}

/// Ids become part of a file name, so they may not contain separators or
/// traversal segments.
pub fn validate_id(id: &str) -> Result<()> {
    if id.is_empty() {
        return Err(StoreError::Validation("message id is required".to_string()));
    }
    if id.contains('/') || id.contains('\\') || id.contains('\0') || id.contains("..") {
        return Err(StoreError::Validation(format!(
            "message id {id:?} contains path characters"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 5).unwrap()
    }

    #[test]
    fn test_message_path_is_date_partitioned() {
        let layout = MessageLayout::new("/repo");
        let path = layout.message_path("test-msg-123", &ts()).unwrap();
        assert_eq!(
            path,
            PathBuf::from("/repo/messages/2024/01/2024-01-15_10-30-05_test-msg-123.json.enc")
        );
        assert_eq!(
            layout.relative(&path),
            PathBuf::from("messages/2024/01/2024-01-15_10-30-05_test-msg-123.json.enc")
        );
    }

    #[test]
    fn test_file_name_has_no_colons() {
        let name = MessageLayout::file_name("abc", &ts());
        assert!(!name.contains(':'));
        assert!(name.ends_with(".json.enc"));
    }

    #[test]
    fn test_path_is_deterministic() {
        let layout = MessageLayout::new("/repo");
        assert_eq!(
            layout.message_path("x", &ts()).unwrap(),
            layout.message_path("x", &ts()).unwrap()
        );
    }

    #[test]
    fn test_rejects_unsafe_ids() {
        let layout = MessageLayout::new("/repo");
        for id in ["", "../etc", "a/b", "a\\b", "nul\0"] {
            assert!(layout.message_path(id, &ts()).is_err(), "{id:?}");
        }
    }

    #[test]
    fn test_match_id() {
        let name = "2024-01-15_10-30-05_test-msg-123.json.enc";
        assert_eq!(MessageLayout::match_id(name, "test-msg-123"), IdMatch::Exact);
        assert_eq!(MessageLayout::match_id(name, "test-msg-12"), IdMatch::Partial);
        assert_eq!(MessageLayout::match_id(name, "other"), IdMatch::None);
        assert_eq!(
            MessageLayout::match_id("test-msg-123.json", "test-msg-123"),
            IdMatch::None
        );
    }
}
