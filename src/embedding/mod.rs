//! Deterministic text-to-vector embedding.
//!
//! Provides the [`EmbeddingProvider`] trait, the [`cosine_similarity`] scoring
//! function, and a feature-hashing implementation that needs no model files and
//! no network. The provider is created via [`create_provider`] from configuration.

pub mod hash;

use anyhow::Result;

/// Trait for embedding text into vectors.
///
/// Implementations produce L2-normalized vectors of exactly `dimensions()`
/// entries, except for input that yields no features at all (empty or
/// whitespace-only text), which maps to the all-zero vector.
///
/// Identical input text must always produce a bit-identical vector.
pub trait EmbeddingProvider: Send + Sync + std::fmt::Debug {
    /// Embed a single text string into a vector.
    fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Return the number of dimensions this provider produces.
    fn dimensions(&self) -> usize;
}

/// Cosine similarity of two vectors.
///
/// Similarity is a bounded score, never an exceptional condition: vectors of
/// different lengths, and vectors with zero magnitude, score 0.0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a.sqrt() * norm_b.sqrt())
}

/// Create an embedding provider from config.
///
/// Currently only `"hash"` is supported (deterministic feature hashing).
pub fn create_provider(
    config: &crate::config::EmbeddingConfig,
) -> Result<Box<dyn EmbeddingProvider>> {
    match config.provider.as_str() {
        "hash" => {
            let provider = hash::HashEmbeddingProvider::new(config)?;
            Ok(Box::new(provider))
        }
        other => anyhow::bail!("unknown embedding provider: {other}. Supported: hash"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cosine_of_vector_with_itself_is_one() {
        let v = vec![0.3f32, -0.5, 0.2, 0.7];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_of_orthogonal_vectors_is_zero() {
        let a = vec![1.0f32, 0.0];
        let b = vec![0.0f32, 1.0];
        assert_eq!(cosine_similarity(&a, &b), 0.0);
    }

    #[test]
    fn cosine_length_mismatch_scores_zero() {
        let a = vec![1.0f32, 0.0, 0.0];
        let b = vec![1.0f32, 0.0];
        assert_eq!(cosine_similarity(&a, &b), 0.0);
    }

    #[test]
    fn cosine_zero_magnitude_scores_zero() {
        let a = vec![0.0f32; 4];
        let b = vec![1.0f32, 0.0, 0.0, 0.0];
        assert_eq!(cosine_similarity(&a, &b), 0.0);
        assert_eq!(cosine_similarity(&b, &a), 0.0);
    }

    #[test]
    fn unknown_provider_is_rejected() {
        let config = crate::config::EmbeddingConfig {
            provider: "onnx".into(),
            dimension: 128,
        };
        let err = create_provider(&config).unwrap_err();
        assert!(err.to_string().contains("unknown embedding provider"));
    }
}
