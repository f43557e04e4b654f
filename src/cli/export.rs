use anyhow::Result;

use crate::config::MnemoConfig;
use crate::store::engine::ConversationStore;

/// Export the whole store as snapshot JSON to stdout.
pub async fn export(config: &MnemoConfig) -> Result<()> {
    let mut store = crate::store::open(config)?;
    let snapshot = store.export().await?;

    let json = serde_json::to_string_pretty(&snapshot)?;
    println!("{json}");

    let payload = snapshot.payload();
    let message_count: usize = payload.messages.iter().map(|(_, m)| m.len()).sum();
    eprintln!(
        "Exported {} session(s) and {} message(s).",
        payload.sessions.len(),
        message_count
    );

    Ok(())
}
