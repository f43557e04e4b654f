//! Linear-scan cosine ranking over stored embeddings.
//!
//! No index structure: every query scans all candidate messages, O(N·D) for N
//! messages with embeddings and dimension D. Fine for the few thousand short
//! messages this store targets.

use serde::Serialize;

use crate::embedding::cosine_similarity;
use crate::store::types::Message;

/// One ranked result.
#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    pub message: Message,
    pub similarity: f32,
}

/// Rank `candidates` against `query`, keeping scores at or above `threshold`,
/// best first, at most `limit` results.
///
/// Messages without an embedding are invisible to ranking. The sort is stable,
/// so ties keep the candidates' original order.
pub fn rank_by_similarity<'a>(
    candidates: impl IntoIterator<Item = &'a Message>,
    query: &[f32],
    threshold: f32,
    limit: usize,
) -> Vec<SearchHit> {
    let mut hits: Vec<SearchHit> = candidates
        .into_iter()
        .filter_map(|message| {
            let embedding = message.embedding.as_ref()?;
            let similarity = cosine_similarity(query, embedding);
            (similarity >= threshold).then(|| SearchHit {
                message: message.clone(),
                similarity,
            })
        })
        .collect();

    hits.sort_by(|a, b| {
        b.similarity
            .partial_cmp(&a.similarity)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    hits.truncate(limit);
    hits
}
