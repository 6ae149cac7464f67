pub mod generate_key;
pub mod list;
pub mod set_status;

use std::path::Path;

use anyhow::{bail, Context, Result};
use mailvault_store::{MessageStore, StorageConfig};
use zeroize::Zeroizing;

use crate::cli::{Cli, Command};

pub async fn run(cli: Cli) -> Result<()> {
    match &cli.command {
        Command::GenerateKey => generate_key::run(),
        Command::List { id, status } => {
            let store = open_store(&cli).await?;
            list::run(&store, id.as_deref(), *status).await
        }
        Command::SetStatus { id, status, push } => {
            let store = open_store(&cli).await?;
            set_status::run(&store, id, *status, *push).await
        }
    }
}

/// Open an existing repository. The operator tools never bootstrap one.
async fn open_store(cli: &Cli) -> Result<MessageStore> {
    ensure_repository(&cli.repo)?;
    let key = Zeroizing::new(cli.resolve_key()?);

    let mut config = StorageConfig::new(cli.repo.clone(), key.to_vec());
    config.branch = cli.branch.clone();

    MessageStore::open(config, None)
        .await
        .with_context(|| format!("Failed to open message store at {}", cli.repo.display()))
}

fn ensure_repository(repo: &Path) -> Result<()> {
    if !repo.join(".git").exists() {
        bail!("No message repository at {}", repo.display());
    }
    Ok(())
}
