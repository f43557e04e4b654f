use anyhow::Result;

use crate::config::MnemoConfig;
use crate::store::engine::ConversationStore;

/// Display store statistics in the terminal.
pub async fn stats(config: &MnemoConfig) -> Result<()> {
    let mut store = crate::store::open(config)?;
    let response = store.stats().await?;

    println!("Conversation Store Statistics");
    println!("{}", "=".repeat(40));
    println!("  Sessions:       {}", response.total_sessions);
    println!("  Messages:       {}", response.total_messages);
    println!("  Storage used:   {} bytes", response.storage_used_bytes);
    if let Some(oldest) = response.oldest_session {
        println!("  Oldest session: {}", oldest.format("%Y-%m-%d %H:%M"));
    }

    Ok(())
}
