//! Command-line arguments.
//!
//! The key may come from `--key` or `MESSAGE_ENCRYPTION_KEY`; both take the
//! 64-character hex form printed by `generate-key`.

use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use mailvault_shared::constants::KEY_ENV_VAR;
use mailvault_shared::{parse_hex_key, MessageStatus, SymmetricKey};

#[derive(Debug, Parser)]
#[command(name = "mailvault", version, about = "Operator tools for the encrypted message repository")]
pub struct Cli {
    /// Path to the messages repository
    #[arg(long, global = true, env = "GIT_REPO_PATH", default_value = "data/messages")]
    pub repo: PathBuf,

    /// Branch the repository commits to and pushes
    #[arg(long, global = true, env = "GIT_BRANCH", default_value = "main")]
    pub branch: String,

    /// Encryption key in hex format (64 chars)
    #[arg(long, global = true, env = "MESSAGE_ENCRYPTION_KEY", hide_env_values = true)]
    pub key: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Generate a new 32-byte encryption key
    GenerateKey,

    /// Decrypt and show messages
    List {
        /// Show a single message in full
        #[arg(long)]
        id: Option<String>,

        /// Filter by status: new, read, replied, closed
        #[arg(long, value_parser = parse_status)]
        status: Option<MessageStatus>,
    },

    /// Change the status of one message
    SetStatus {
        /// Message ID to update
        #[arg(long)]
        id: String,

        /// New status: new, read, replied, closed
        #[arg(long, value_parser = parse_status)]
        status: MessageStatus,

        /// Push the resulting commit to the remote
        #[arg(long)]
        push: bool,
    },
}

fn parse_status(s: &str) -> Result<MessageStatus, String> {
    s.parse().map_err(|e: mailvault_shared::InvalidStatus| e.to_string())
}

impl Cli {
    /// Decode the key given by flag or environment.
    pub fn resolve_key(&self) -> Result<SymmetricKey> {
        let hex_key = self.key.as_deref().filter(|k| !k.is_empty()).ok_or_else(|| {
            anyhow!("Encryption key required: use --key flag or {KEY_ENV_VAR} env var")
        })?;
        parse_hex_key(hex_key).context("Key must be 32 bytes (64 hex characters)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_list_with_filter() {
        let cli = Cli::try_parse_from([
            "mailvault",
            "--repo",
            "/tmp/repo",
            "list",
            "--status",
            "replied",
        ])
        .unwrap();
        assert_eq!(cli.repo, PathBuf::from("/tmp/repo"));
        assert_eq!(cli.branch, "main");
        match cli.command {
            Command::List { id, status } => {
                assert!(id.is_none());
                assert_eq!(status, Some(MessageStatus::Replied));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_rejects_unknown_status() {
        let result = Cli::try_parse_from([
            "mailvault",
            "set-status",
            "--id",
            "a",
            "--status",
            "archived",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_resolve_key_from_flag() {
        let key = "cd".repeat(32);
        let cli = Cli::try_parse_from(["mailvault", "--key", &key, "list"]).unwrap();
        assert_eq!(cli.resolve_key().unwrap(), [0xcd; 32]);
    }

    #[test]
    fn test_resolve_key_rejects_short_key() {
        let cli = Cli::try_parse_from(["mailvault", "--key", "abcd", "list"]).unwrap();
        assert!(cli.resolve_key().is_err());
    }

    #[test]
    fn test_set_status_flags() {
        let cli = Cli::try_parse_from([
            "mailvault",
            "set-status",
            "--id",
            "msg-1",
            "--status",
            "closed",
            "--push",
            "--branch",
            "inbox",
        ])
        .unwrap();
        assert_eq!(cli.branch, "inbox");
        match cli.command {
            Command::SetStatus { id, status, push } => {
                assert_eq!(id, "msg-1");
                assert_eq!(status, MessageStatus::Closed);
                assert!(push);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
