use anyhow::Result;

use crate::config::MnemoConfig;
use crate::store::engine::ConversationStore;

/// Run the retention policy and report what was evicted.
pub async fn cleanup(config: &MnemoConfig) -> Result<()> {
    let mut store = crate::store::open(config)?;
    let report = store.cleanup().await?;

    if report.is_noop() {
        println!("Nothing to clean up.");
        return Ok(());
    }

    println!("Cleanup complete:");
    println!("  Expired sessions deleted:  {}", report.expired_sessions);
    println!("  Overflow sessions deleted: {}", report.overflow_sessions);
    println!("  Messages trimmed:          {}", report.trimmed_messages);

    Ok(())
}
