//! Embedding Model for Text Vectorization
//!
//! This module provides text-to-vector conversion for chunk search. Models
//! run locally so that indexing has no network dependency.
//!
//! # Architecture
//!
//! - **EmbeddingModel**: the trait the store indexes through
//! - **HashingEmbedder**: feature-hashed bag of words; texts sharing terms get
//!   nearby vectors, which is enough for keyword-grade semantic search and for
//!   deterministic tests
//!
//! # Examples
//!
//! ```rust
//! use evident_store::embedding::{HashingEmbedder, EmbeddingModel, cosine_similarity};
//!
//! let model = HashingEmbedder::new(256);
//! let a = model.embed("refund policy for card payments").unwrap();
//! let b = model.embed("card payment refund policy").unwrap();
//! let c = model.embed("terminal installation guide").unwrap();
//! assert!(cosine_similarity(&a, &b) > cosine_similarity(&a, &c));
//! ```

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use thiserror::Error;

/// Errors that can occur during embedding generation
#[derive(Error, Debug)]
pub enum EmbeddingError {
    /// Invalid input text
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Model inference error
    #[error("Model inference failed: {0}")]
    InferenceFailed(String),
}

/// Trait for embedding models
pub trait EmbeddingModel: Send + Sync {
    /// Generate an embedding vector for the given text
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;

    /// Get the dimension of embeddings produced by this model
    fn dimension(&self) -> usize;
}

/// Feature-hashing embedder
///
/// Each lowercase alphanumeric token is hashed into one of `dimension`
/// buckets with a hashed sign; the result is normalized to unit length.
/// Embeddings are:
///
/// - **Deterministic**: Same text always produces same embedding
/// - **Normalized**: All vectors have unit length (for cosine similarity)
/// - **Overlap-sensitive**: Shared terms raise cosine similarity
pub struct HashingEmbedder {
    dimension: usize,
}

impl HashingEmbedder {
    /// Create a new embedder
    ///
    /// # Parameters
    ///
    /// - `dimension`: The embedding dimension (e.g., 384)
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
        }
    }

    fn bucket(&self, token: &str) -> (usize, f32) {
        let mut hasher = DefaultHasher::new();
        token.hash(&mut hasher);
        let h = hasher.finish();
        let index = (h % self.dimension as u64) as usize;
        let sign = if (h >> 63) == 0 { 1.0 } else { -1.0 };
        (index, sign)
    }
}

/// Lowercase alphanumeric tokens (keeps `.` and `%` inside tokens, e.g. "2.5%")
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !(c.is_alphanumeric() || c == '.' || c == '%'))
        .map(|t| t.trim_matches('.').to_lowercase())
        .filter(|t| !t.is_empty())
        .collect()
}

impl EmbeddingModel for HashingEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let tokens = tokenize(text);
        if tokens.is_empty() {
            return Err(EmbeddingError::InvalidInput(
                "Empty text cannot be embedded".to_string(),
            ));
        }

        let mut embedding = vec![0.0f32; self.dimension];
        for token in &tokens {
            let (index, sign) = self.bucket(token);
            embedding[index] += sign;
        }

        // Normalize to unit length for cosine similarity
        let magnitude: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        if magnitude == 0.0 {
            return Err(EmbeddingError::InferenceFailed(
                "Tokens cancelled to a zero vector".to_string(),
            ));
        }
        for value in &mut embedding {
            *value /= magnitude;
        }

        Ok(embedding)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

/// Calculate cosine similarity between two embedding vectors
///
/// Returns a value in [-1, 1]; mismatched lengths or zero vectors yield 0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let magnitude_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let magnitude_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if magnitude_a == 0.0 || magnitude_b == 0.0 {
        return 0.0;
    }

    dot_product / (magnitude_a * magnitude_b)
}

/// Encode an embedding as little-endian bytes for BLOB storage
pub fn to_bytes(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|v| v.to_le_bytes()).collect()
}

/// Decode little-endian bytes back into an embedding
pub fn from_bytes(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedding_deterministic() {
        let model = HashingEmbedder::new(384);
        let text = "Interchange fees for card-present transactions";
        assert_eq!(model.embed(text).unwrap(), model.embed(text).unwrap());
    }

    #[test]
    fn test_embedding_dimension() {
        let model = HashingEmbedder::new(128);
        assert_eq!(model.embed("test").unwrap().len(), 128);
        assert_eq!(model.dimension(), 128);
    }

    #[test]
    fn test_empty_text_rejected() {
        let model = HashingEmbedder::new(64);
        assert!(model.embed("  ,, ").is_err());
    }

    #[test]
    fn test_normalized() {
        let model = HashingEmbedder::new(256);
        let e = model.embed("chargeback dispute window").unwrap();
        let magnitude: f32 = e.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((magnitude - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_tokenize_keeps_rates() {
        assert_eq!(tokenize("Fee is 2.5%."), vec!["fee", "is", "2.5%"]);
    }

    #[test]
    fn test_bytes_round_trip() {
        let v = vec![0.25f32, -1.5, 3.0];
        assert_eq!(from_bytes(&to_bytes(&v)), v);
    }
}
