use anyhow::{Context, Result};
use std::path::Path;

use crate::config::MnemoConfig;
use crate::persist::snapshot::Snapshot;
use crate::store::engine::ConversationStore;

/// Import a snapshot JSON file, replacing the current store contents.
pub async fn import(config: &MnemoConfig, file: &Path) -> Result<()> {
    let json = std::fs::read_to_string(file)
        .with_context(|| format!("failed to read import file: {}", file.display()))?;

    let snapshot = Snapshot::decode(&json).context("failed to parse import JSON")?;

    let mut store = crate::store::open(config)?;
    store.import(&snapshot).await?;

    let payload = snapshot.payload();
    let message_count: usize = payload.messages.iter().map(|(_, m)| m.len()).sum();
    println!(
        "Imported {} session(s), {} message(s), {} embedding(s).",
        payload.sessions.len(),
        message_count,
        payload.embeddings.len()
    );

    Ok(())
}
