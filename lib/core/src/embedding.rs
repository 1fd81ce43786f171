//! Embedding provider seam.
//!
//! The real text->vector model is an external collaborator; the engine
//! only needs a trait to call and a deterministic fallback so scoring
//! never fails on sparse or out-of-vocabulary text. The fallback hashes
//! character trigrams into a fixed-dimension bag vector: fully
//! reproducible across runs and platforms, which is what lets repeated
//! profile recomputation stay byte-stable.

use crate::normalize::tokenize;
use crate::vector::l2_normalize;

pub const DEFAULT_EMBEDDING_DIM: usize = 128;

/// Black-box text -> fixed-length vector provider.
pub trait EmbeddingProvider: Send + Sync {
    fn dimension(&self) -> usize;

    /// Embed normalized text. `None` signals the provider considers the
    /// text empty or fully out-of-vocabulary; callers fall back to
    /// [`hash_embedding`] instead of failing.
    fn embed(&self, normalized_text: &str) -> Option<Vec<f32>>;
}

/// FNV-1a, 64-bit. Hand-rolled because the embedding must hash the same
/// on every run and platform; seeded hashers (ahash) do not guarantee
/// that.
fn fnv1a64(bytes: &[u8]) -> u64 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;
    let mut hash = OFFSET;
    for b in bytes {
        hash ^= u64::from(*b);
        hash = hash.wrapping_mul(PRIME);
    }
    hash
}

/// Deterministic character-trigram hash embedding, L2-normalized.
/// Empty text yields the zero vector.
pub fn hash_embedding(text: &str, dim: usize) -> Vec<f32> {
    let mut vec = vec![0.0f32; dim];
    if dim == 0 {
        return vec;
    }
    for token in tokenize(text) {
        let padded = format!("^{token}$");
        let bytes = padded.as_bytes();
        if bytes.len() < 3 {
            let idx = (fnv1a64(bytes) % dim as u64) as usize;
            vec[idx] += 1.0;
        } else {
            for chunk in bytes.windows(3) {
                let idx = (fnv1a64(chunk) % dim as u64) as usize;
                vec[idx] += 1.0;
            }
        }
    }
    l2_normalize(&mut vec);
    vec
}

/// Default in-process provider backed by [`hash_embedding`].
#[derive(Debug, Clone)]
pub struct HashEmbedder {
    dim: usize,
}

impl HashEmbedder {
    pub fn new(dim: usize) -> Self {
        Self { dim }
    }
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self::new(DEFAULT_EMBEDDING_DIM)
    }
}

impl EmbeddingProvider for HashEmbedder {
    fn dimension(&self) -> usize {
        self.dim
    }

    fn embed(&self, normalized_text: &str) -> Option<Vec<f32>> {
        if tokenize(normalized_text).is_empty() {
            return None;
        }
        Some(hash_embedding(normalized_text, self.dim))
    }
}
