use anyhow::{Context, Result};
use mailvault_shared::MessageStatus;
use mailvault_store::MessageStore;
use tracing::info;

pub async fn run(store: &MessageStore, id: &str, status: MessageStatus, push: bool) -> Result<()> {
    store
        .update_status(id, status)
        .await
        .with_context(|| format!("Failed to update message {id}"))?;
    println!("Updated message {id} status to {status}");

    if push {
        store.push().await.context("Failed to push to remote")?;
        info!(branch = %store.git().branch(), "Pushed status change");
        println!("Pushed to remote");
    }
    Ok(())
}
