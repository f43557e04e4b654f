//! Feature-hashing embedding provider.
//!
//! Implements [`EmbeddingProvider`] with deterministic bigram + word hashing:
//! character bigrams over the whitespace-stripped text fill the first half of the
//! vector, whitespace-delimited words fill the second half. The result is
//! L2-normalized. Identical input always yields a bit-identical vector.

use anyhow::Result;

use super::EmbeddingProvider;
use crate::config::EmbeddingConfig;

/// Deterministic feature-hashing embedding provider.
#[derive(Debug)]
pub struct HashEmbeddingProvider {
    dimension: usize,
}

impl HashEmbeddingProvider {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        anyhow::ensure!(
            config.dimension >= 2 && config.dimension % 2 == 0,
            "embedding dimension must be an even number >= 2, got {}",
            config.dimension
        );
        Ok(Self {
            dimension: config.dimension,
        })
    }
}

impl EmbeddingProvider for HashEmbeddingProvider {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vector = vec![0.0f32; self.dimension];
        let half = self.dimension / 2;

        let normalized = text.trim().to_lowercase();

        // Character bigrams over the whitespace-stripped text → first half.
        let compact: Vec<char> = normalized.chars().filter(|c| !c.is_whitespace()).collect();
        for pair in compact.windows(2) {
            let bigram: String = pair.iter().collect();
            let bucket = (rolling_hash(&bigram) as usize) % half;
            vector[bucket] += 1.0;
        }

        // Whitespace-delimited words → second half.
        for word in normalized.split_whitespace() {
            let bucket = (rolling_hash(word) as usize) % half;
            vector[half + bucket] += 1.0;
        }

        Ok(l2_normalize(&vector))
    }

    fn dimensions(&self) -> usize {
        self.dimension
    }
}

/// Rolling 32-bit string hash: `h = h * 31 + char`, expressed as
/// shift-subtract-add with wrapping arithmetic.
fn rolling_hash(s: &str) -> u32 {
    let mut hash = 0u32;
    for c in s.chars() {
        hash = hash
            .wrapping_shl(5)
            .wrapping_sub(hash)
            .wrapping_add(c as u32);
    }
    hash
}

/// L2-normalize a vector. Returns a zero vector if the input norm is zero.
fn l2_normalize(v: &[f32]) -> Vec<f32> {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        v.iter().map(|x| x / norm).collect()
    } else {
        v.to_vec()
    }
}
