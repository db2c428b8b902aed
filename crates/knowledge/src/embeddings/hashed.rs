//! Hashed trigram embedding provider.

use crate::embeddings::EmbeddingProvider;
use lumen_core::AppResult;
use std::collections::{HashMap, HashSet};

/// Common English function words excluded from the embedding.
const STOP_WORDS: &[&str] = &[
    "the", "is", "at", "which", "on", "a", "an", "as", "are", "was", "were", "for", "to", "of",
    "in", "and", "or", "but", "with", "by", "from", "this", "that", "be", "have", "has", "had",
    "it", "its", "their", "they", "them",
];

/// Deterministic, offline embedding provider.
///
/// Hashes the character trigrams and whole words of the input into a
/// fixed-size vector and normalizes it. Not semantically accurate like a
/// neural model, but content-dependent, stable across runs, and free of
/// network dependencies, which is what the retrieval layer needs to stay
/// testable offline.
#[derive(Debug)]
pub struct HashedTrigramProvider {
    dimensions: usize,
}

impl HashedTrigramProvider {
    /// Create a new provider with the given vector dimension.
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }

    /// Build the embedding for one text.
    fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut embedding = vec![0.0f32; self.dimensions];

        let stop_words: HashSet<&str> = STOP_WORDS.iter().copied().collect();
        let lower = text.to_lowercase();

        let mut word_freq: HashMap<&str, u32> = HashMap::new();
        for word in lower
            .split_whitespace()
            .filter(|w| w.len() > 2 && !stop_words.contains(w))
        {
            *word_freq.entry(word).or_insert(0) += 1;
        }

        for (word, freq) in &word_freq {
            let chars: Vec<char> = word.chars().collect();

            // Spread each trigram over a hash-selected dimension
            for window in chars.windows(3) {
                let mut hash = 0u64;
                for ch in window {
                    let mut buf = [0u8; 4];
                    for b in ch.encode_utf8(&mut buf).bytes() {
                        hash = hash.wrapping_mul(37).wrapping_add(b as u64);
                    }
                }
                let dim = (hash as usize) % self.dimensions;
                embedding[dim] += (*freq as f32).sqrt();
            }

            // And the whole word, so short words still contribute
            let word_hash = word
                .bytes()
                .fold(0u64, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u64));
            embedding[(word_hash as usize) % self.dimensions] += *freq as f32;
        }

        normalize(&mut embedding);
        embedding
    }
}

/// Scale a vector to unit length in place.
fn normalize(v: &mut [f32]) {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for HashedTrigramProvider {
    fn provider_name(&self) -> &str {
        "hashed"
    }

    fn model_name(&self) -> &str {
        "hashed-trigram-v1"
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_text(t)).collect())
    }
}
