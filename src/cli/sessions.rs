use anyhow::Result;

use crate::config::MnemoConfig;
use crate::store::engine::ConversationStore;

/// List all sessions, most recently updated first.
pub async fn sessions(config: &MnemoConfig) -> Result<()> {
    let mut store = crate::store::open(config)?;
    let sessions = store.all_sessions().await?;

    if sessions.is_empty() {
        println!("No sessions stored.");
        return Ok(());
    }

    println!("{} session(s)\n", sessions.len());
    for session in &sessions {
        println!(
            "  {}  [{} message(s), updated {}]",
            session.id,
            session.message_count,
            session.updated_at.format("%Y-%m-%d %H:%M"),
        );
        println!("     {}", session.title);
        if !session.preview.is_empty() {
            println!("     {}", session.preview);
        }
        println!();
    }

    Ok(())
}
