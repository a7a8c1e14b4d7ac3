//! Hashed character-trigram embeddings.

use crate::embeddings::provider::EmbeddingProvider;
use ragline_core::AppResult;

const STOP_WORDS: &[&str] = &[
    "the", "is", "at", "which", "on", "a", "an", "as", "are", "was", "were", "for", "to", "of",
    "in", "and", "or", "but", "with", "by", "from", "this", "that", "be", "have", "has", "had",
    "it", "its", "how", "do", "does", "can", "what", "my", "your", "you", "i",
];

/// Offline, deterministic embedding provider.
///
/// Each word is padded with boundary markers and broken into character
/// trigrams; trigrams and whole words are hashed into signed buckets and the
/// result is scaled to unit length. Texts sharing vocabulary land close
/// together, which is enough for local development and tests.
#[derive(Debug, Clone)]
pub struct TrigramProvider {
    model: String,
    dimensions: usize,
}

impl TrigramProvider {
    pub fn new(model: impl Into<String>, dimensions: usize) -> Self {
        Self {
            model: model.into(),
            dimensions: dimensions.max(1),
        }
    }

    fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut embedding = vec![0.0f32; self.dimensions];
        let lower = text.to_lowercase();

        let words = lower
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty() && !STOP_WORDS.contains(w));

        for word in words {
            let padded: Vec<char> = std::iter::once('^')
                .chain(word.chars())
                .chain(std::iter::once('$'))
                .collect();

            for window in padded.windows(3) {
                self.accumulate(&mut embedding, fnv1a(window.iter().copied()), 1.0);
            }
            self.accumulate(&mut embedding, fnv1a(word.chars()), 2.0);
        }

        let norm = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            embedding.iter_mut().for_each(|v| *v /= norm);
        }
        embedding
    }

    fn accumulate(&self, embedding: &mut [f32], hash: u64, weight: f32) {
        let bucket = (hash % self.dimensions as u64) as usize;
        let sign = if (hash >> 63) == 0 { 1.0 } else { -1.0 };
        embedding[bucket] += sign * weight;
    }
}

fn fnv1a(chars: impl Iterator<Item = char>) -> u64 {
    let mut hash = 0xcbf2_9ce4_8422_2325u64;
    let mut buf = [0u8; 4];
    for c in chars {
        for byte in c.encode_utf8(&mut buf).bytes() {
            hash ^= u64::from(byte);
            hash = hash.wrapping_mul(0x0100_0000_01b3);
        }
    }
    hash
}

#[async_trait::async_trait]
impl EmbeddingProvider for TrigramProvider {
    fn provider_name(&self) -> &str {
        "trigram"
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|text| self.embed_text(text)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cosine(a: &[f32], b: &[f32]) -> f32 {
        a.iter().zip(b).map(|(x, y)| x * y).sum()
    }

    fn norm(v: &[f32]) -> f32 {
        v.iter().map(|x| x * x).sum::<f32>().sqrt()
    }

    #[tokio::test]
    async fn test_unit_length_and_dimensions() {
        let provider = TrigramProvider::new("trigram-v1", 384);
        let embedding = provider.embed("Connect to eduroam wifi").await.unwrap();

        assert_eq!(embedding.len(), 384);
        assert!((norm(&embedding) - 1.0).abs() < 1e-4);
    }

    #[tokio::test]
    async fn test_deterministic() {
        let provider = TrigramProvider::new("trigram-v1", 384);
        let a = provider.embed("password reset portal").await.unwrap();
        let b = provider.embed("password reset portal").await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn test_shared_vocabulary_scores_higher() {
        let provider = TrigramProvider::new("trigram-v1", 384);
        let query = provider.embed("How do I reset my password?").await.unwrap();
        let related = provider
            .embed("To reset your password visit the account portal.")
            .await
            .unwrap();
        let unrelated = provider
            .embed("The cafeteria serves lunch at noon.")
            .await
            .unwrap();

        assert!(cosine(&query, &related) > cosine(&query, &unrelated));
    }

    #[tokio::test]
    async fn test_empty_text_is_zero_vector() {
        let provider = TrigramProvider::new("trigram-v1", 64);
        let embedding = provider.embed("").await.unwrap();
        assert!(embedding.iter().all(|&x| x == 0.0));
    }

    #[tokio::test]
    async fn test_non_ascii_text() {
        let provider = TrigramProvider::new("trigram-v1", 128);
        let embedding = provider
            .embed("Configuração do e-mail 📧 institucional")
            .await
            .unwrap();
        assert!((norm(&embedding) - 1.0).abs() < 1e-4);
    }
}
