use anyhow::Result;

use crate::config::MnemoConfig;
use crate::store::engine::{ConversationStore, SearchQuery};

/// Run a similarity search from the terminal.
pub async fn search(
    config: &MnemoConfig,
    query: &str,
    session_id: Option<&str>,
    limit: Option<usize>,
) -> Result<()> {
    let mut store = crate::store::open(config)?;
    let limit = limit.unwrap_or(config.retrieval.default_max_results);

    let hits = store
        .search_similar(&SearchQuery::Text(query), session_id, limit)
        .await?;

    if hits.is_empty() {
        println!("No results found.");
        return Ok(());
    }

    println!("Found {} result(s)\n", hits.len());
    for (i, hit) in hits.iter().enumerate() {
        let preview = if hit.message.content.chars().count() > 120 {
            let truncated: String = hit.message.content.chars().take(120).collect();
            format!("{truncated}...")
        } else {
            hit.message.content.clone()
        };

        println!(
            "  {}. [{}] {} (similarity: {:.4})",
            i + 1,
            hit.message.role,
            hit.message.id,
            hit.similarity,
        );
        println!("     {preview}");
        println!();
    }

    Ok(())
}
