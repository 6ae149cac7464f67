//! Thin driver over the `git` executable.
//!
//! Every command runs as `git -C <repo> …` with `kill_on_drop`, so dropping
//! the returned future (caller cancellation or the configured timeout)
//! terminates the subprocess. Nothing is rolled back when that happens.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use mailvault_shared::constants::{MESSAGES_DIR, RECORD_SUFFIX};
use tokio::process::Command;
use tracing::{debug, info, trace, warn};

use crate::config::StorageConfig;
use crate::error::{Result, StoreError};

const README: &str = "# Encrypted Messages Repository

This repository contains encrypted contact form messages.
DO NOT commit unencrypted messages or encryption keys.
";

const GITIGNORE: &str = "*.tmp\n";

/// Remote name used for replication.
pub const REMOTE_NAME: &str = "origin";

#[derive(Debug, Clone)]
pub struct GitDriver {
    program: PathBuf,
    repo: PathBuf,
    remote_url: Option<String>,
    branch: String,
    author: String,
    email: String,
    timeout: Duration,
}

impl GitDriver {
    pub fn new(config: &StorageConfig) -> Self {
        Self {
            program: PathBuf::from("git"),
            repo: config.repo_path.clone(),
            remote_url: config.remote_url.clone(),
            branch: config.branch.clone(),
            author: config.commit_author.clone(),
            email: config.commit_email.clone(),
            timeout: config.command_timeout,
        }
    }

    #[cfg(test)]
    pub(crate) fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    pub fn branch(&self) -> &str {
        &self.branch
    }

    pub fn has_remote(&self) -> bool {
        self.remote_url.is_some()
    }

    /// A repository exists when its `.git` control directory does.
    pub fn is_repository(&self) -> bool {
        self.repo.join(".git").exists()
    }

    /// Create and bootstrap the repository. Returns `false` without touching
    /// anything when one already exists.
    pub async fn init_repository(&self) -> Result<bool> {
        if self.is_repository() {
            info!(path = %self.repo.display(), "Repository already exists");
            return Ok(false);
        }

        tokio::fs::create_dir_all(&self.repo)
            .await
            .map_err(|e| StoreError::io("failed to create repo directory", e))?;

        self.run(&["init"]).await?;
        self.set_branch().await;
        self.config_set("user.name", &self.author).await;
        self.config_set("user.email", &self.email).await;

        tokio::fs::write(self.repo.join("README.md"), README)
            .await
            .map_err(|e| StoreError::io("failed to create README", e))?;
        tokio::fs::write(self.repo.join(".gitignore"), GITIGNORE)
            .await
            .map_err(|e| StoreError::io("failed to create .gitignore", e))?;

        // git does not track empty directories.
        let messages_dir = self.repo.join(MESSAGES_DIR);
        tokio::fs::create_dir_all(&messages_dir)
            .await
            .map_err(|e| StoreError::io("failed to create messages directory", e))?;
        tokio::fs::write(messages_dir.join(".gitkeep"), "")
            .await
            .map_err(|e| StoreError::io("failed to create messages directory", e))?;

        self.add(Path::new(".")).await?;
        self.commit("Initial commit").await?;

        if let Some(url) = &self.remote_url {
            self.remote_add(REMOTE_NAME, url).await;
        }

        info!(path = %self.repo.display(), "Repository initialized");
        Ok(true)
    }

    /// Stage one path (relative to the repository root).
    pub async fn add(&self, path: &Path) -> Result<()> {
        let path = path.to_string_lossy();
        self.run(&["add", "--", &path]).await?;
        Ok(())
    }

    pub async fn commit(&self, message: &str) -> Result<()> {
        self.run(&["commit", "-m", message]).await?;
        Ok(())
    }

    /// Push the configured branch to `origin`.
    pub async fn push(&self) -> Result<()> {
        match self.run(&["push", REMOTE_NAME, &self.branch]).await {
            Ok(_) => {
                info!(branch = %self.branch, "Pushed to remote");
                Ok(())
            }
            Err(e) => {
                warn!(branch = %self.branch, error = %e, "Push failed");
                Err(e)
            }
        }
    }

    /// Best effort: configuration is never on the critical path.
    pub async fn config_set(&self, key: &str, value: &str) {
        if value.is_empty() {
            return;
        }
        if let Err(e) = self.run(&["config", key, value]).await {
            debug!(key, error = %e, "git config failed");
        }
    }

    pub async fn remote_add(&self, name: &str, url: &str) {
        if let Err(e) = self.run(&["remote", "add", name, url]).await {
            warn!(name, error = %e, "Failed to add remote");
        }
    }

    /// Point the unborn `HEAD` at the configured branch so the first commit
    /// lands there regardless of the installed git's default.
    async fn set_branch(&self) {
        let head = format!("refs/heads/{}", self.branch);
        if let Err(e) = self.run(&["symbolic-ref", "HEAD", &head]).await {
            debug!(branch = %self.branch, error = %e, "Failed to set initial branch");
        }
    }

    /// Record files under `messages/` that are untracked or modified.
    pub async fn uncommitted_records(&self) -> Result<Vec<PathBuf>> {
        let output = self
            .run(&[
                "status",
                "--porcelain",
                "-z",
                "--untracked-files=all",
                "--",
                MESSAGES_DIR,
            ])
            .await?;

        // Entries are `XY <path>` separated by NUL.
        let records = output
            .split('\0')
            .filter(|entry| entry.len() > 3)
            .map(|entry| &entry[3..])
            .filter(|path| path.ends_with(RECORD_SUFFIX))
            .map(PathBuf::from)
            .collect();
        Ok(records)
    }

    /// Number of commits reachable from `HEAD`.
    pub async fn commit_count(&self) -> Result<usize> {
        let output = self.run(&["rev-list", "--count", "HEAD"]).await?;
        output.trim().parse().map_err(|_| StoreError::Git {
            command: "rev-list".to_string(),
            output,
        })
    }

    /// Run a git command and return its stdout. On failure the error carries
    /// stdout and stderr combined.
    async fn run(&self, args: &[&str]) -> Result<String> {
        let mut cmd = Command::new(&self.program);
        cmd.arg("-C")
            .arg(&self.repo)
            .args(args)
            .env("GIT_TERMINAL_PROMPT", "0")
            .stdin(Stdio::null())
            .kill_on_drop(true);

        trace!(
            cmd = %format!("git -C {} {}", self.repo.display(), args.join(" ")),
            "running git command"
        );

        let command = args.first().copied().unwrap_or_default().to_string();
        let output = match tokio::time::timeout(self.timeout, cmd.output()).await {
            Ok(result) => result.map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    StoreError::io("git executable not found in PATH", e)
                } else {
                    StoreError::io(format!("failed to spawn git {command}"), e)
                }
            })?,
            Err(_) => {
                warn!(command = %command, "git command timed out");
                return Err(StoreError::GitTimeout {
                    command,
                    secs: self.timeout.as_secs(),
                });
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        if output.status.success() {
            debug!(command = %command, "git command succeeded");
            Ok(stdout)
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let combined = format!("{}{}", stdout, stderr).trim().to_string();
            Err(StoreError::Git {
                command,
                output: combined,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mailvault_shared::ErrorKind;

    fn driver(path: &Path) -> GitDriver {
        let mut config = StorageConfig::new(path, vec![0u8; 32]);
        config.commit_author = "Test User".to_string();
        config.commit_email = "test@example.com".to_string();
        GitDriver::new(&config)
    }

    #[tokio::test]
    async fn test_init_creates_bootstrap_commit() {
        let dir = tempfile::tempdir().unwrap();
        let repo = dir.path().join("repo");
        let git = driver(&repo);

        assert!(!git.is_repository());
        assert!(git.init_repository().await.unwrap());
        assert!(git.is_repository());
        assert!(repo.join("README.md").exists());
        assert!(repo.join("messages").is_dir());
        assert_eq!(git.commit_count().await.unwrap(), 1);

        let head = git.run(&["rev-parse", "--abbrev-ref", "HEAD"]).await.unwrap();
        assert_eq!(head.trim(), "main");
    }

    #[tokio::test]
    async fn test_init_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let git = driver(dir.path());

        assert!(git.init_repository().await.unwrap());
        assert!(!git.init_repository().await.unwrap());
        assert_eq!(git.commit_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_init_registers_remote() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = StorageConfig::new(dir.path(), vec![0u8; 32]);
        config.commit_author = "Test User".to_string();
        config.commit_email = "test@example.com".to_string();
        config.remote_url = Some("https://example.invalid/inbox.git".to_string());
        let git = GitDriver::new(&config);

        git.init_repository().await.unwrap();
        let url = git.run(&["remote", "get-url", "origin"]).await.unwrap();
        assert_eq!(url.trim(), "https://example.invalid/inbox.git");
    }

    #[tokio::test]
    async fn test_add_missing_file_fails_with_output() {
        let dir = tempfile::tempdir().unwrap();
        let git = driver(dir.path());
        git.init_repository().await.unwrap();

        let err = git.add(Path::new("messages/nope.json.enc")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
        assert!(matches!(err, StoreError::Git { ref output, .. } if !output.is_empty()));
    }

    #[tokio::test]
    async fn test_commit_without_changes_fails() {
        let dir = tempfile::tempdir().unwrap();
        let git = driver(dir.path());
        git.init_repository().await.unwrap();

        let err = git.commit("nothing here").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
    }

    #[tokio::test]
    async fn test_push_without_remote_fails() {
        let dir = tempfile::tempdir().unwrap();
        let git = driver(dir.path());
        git.init_repository().await.unwrap();

        assert!(git.push().await.is_err());
    }

    #[tokio::test]
    async fn test_config_set_is_best_effort() {
        let dir = tempfile::tempdir().unwrap();
        // Not a repository: the command fails but nothing is reported.
        let git = driver(&dir.path().join("missing"));
        git.config_set("user.name", "Nobody").await;
    }

    #[tokio::test]
    async fn test_missing_git_executable_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let git = driver(dir.path()).with_program(dir.path().join("no-such-git"));

        let err = git.init_repository().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
        assert!(matches!(
            err,
            StoreError::Io { ref context, .. } if context.contains("not found")
        ));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_slow_command_times_out() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let mut config = StorageConfig::new(dir.path(), vec![0u8; 32]);
        config.command_timeout = Duration::from_secs(1);
        let git = GitDriver::new(&config);
        git.init_repository().await.unwrap();

        let hook = dir.path().join(".git/hooks/pre-commit");
        std::fs::write(&hook, "#!/bin/sh\nsleep 3\n").unwrap();
        std::fs::set_permissions(&hook, std::fs::Permissions::from_mode(0o755)).unwrap();
        std::fs::write(dir.path().join("notes.md"), "pending").unwrap();
        git.add(Path::new("notes.md")).await.unwrap();

        let err = git.commit("slow").await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::GitTimeout { ref command, secs: 1 } if command == "commit"
        ));
        assert_eq!(err.kind(), ErrorKind::Io);
        assert_eq!(git.commit_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_uncommitted_records() {
        let dir = tempfile::tempdir().unwrap();
        let git = driver(dir.path());
        git.init_repository().await.unwrap();
        assert!(git.uncommitted_records().await.unwrap().is_empty());

        let month = dir.path().join("messages/2024/01");
        std::fs::create_dir_all(&month).unwrap();
        std::fs::write(month.join("2024-01-01_00-00-00_a.json.enc"), "{}").unwrap();
        std::fs::write(month.join("notes.txt"), "ignored").unwrap();

        let pending = git.uncommitted_records().await.unwrap();
        assert_eq!(
            pending,
            vec![PathBuf::from("messages/2024/01/2024-01-01_00-00-00_a.json.enc")]
        );
    }
}
