//! Offline embedder built from hashed words and character trigrams.

use super::Embedder;
use crate::error::Result;
use async_trait::async_trait;

const STOP_WORDS: &[&str] = &[
    "the", "is", "at", "which", "on", "a", "an", "as", "are", "was", "were", "for", "to", "of",
    "in", "and", "or", "but", "with", "by", "from", "this", "that", "be", "what", "where", "who",
];

/// Deterministic, content-dependent embeddings without a model.
///
/// Texts sharing words land close together under cosine similarity;
/// there is no semantic understanding beyond that.
#[derive(Debug, Clone)]
pub struct TrigramEmbedder {
    dimension: usize,
}

impl TrigramEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }

    fn bucket(&self, bytes: &[u8], mul: u64) -> usize {
        let hash = bytes
            .iter()
            .fold(0u64, |acc, &b| acc.wrapping_mul(mul).wrapping_add(b as u64));
        (hash % self.dimension as u64) as usize
    }

    /// Unit-length embedding of `text`; all zeros when no word survives filtering.
    pub fn embed_sync(&self, text: &str) -> Vec<f32> {
        let mut embedding = vec![0.0f32; self.dimension];
        let lower = text.to_lowercase();

        let words = lower
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| w.chars().count() > 1 && !STOP_WORDS.contains(w));

        for word in words {
            embedding[self.bucket(word.as_bytes(), 31)] += 1.0;

            let chars: Vec<char> = word.chars().collect();
            for window in chars.windows(3) {
                let trigram: String = window.iter().collect();
                embedding[self.bucket(trigram.as_bytes(), 37)] += 0.5;
            }
        }

        let norm = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            embedding.iter_mut().for_each(|x| *x /= norm);
        }
        embedding
    }
}

#[async_trait]
impl Embedder for TrigramEmbedder {
    fn name(&self) -> &str {
        "trigram"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.embed_sync(text))
    }
}
