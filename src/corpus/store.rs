use std::fs;
use std::future::Future;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::CorpusError;
use crate::openai::Embedder;

/// A chunk handed back by retrieval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedDoc {
    pub content: String,
    pub source: String,
    pub file_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredChunk {
    pub content: String,
    pub source: String,
    pub file_path: String,
    pub embedding: Vec<f32>,
}

/// Flat embedding index persisted as a single JSON file.
///
/// Search is exhaustive cosine similarity; the corpus is small enough that an
/// ANN index would not pay for itself.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VectorStore {
    pub embedding_model: String,
    pub chunks: Vec<StoredChunk>,
}

impl VectorStore {
    pub fn new(embedding_model: impl Into<String>) -> Self {
        Self {
            embedding_model: embedding_model.into(),
            chunks: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn load(path: &Path) -> Result<Self, CorpusError> {
        if !path.exists() {
            return Err(CorpusError::NotFound(format!(
                "vector store not found at {}",
                path.display()
            )));
        }
        let bytes = fs::read(path)?;
        let store: Self = serde_json::from_slice(&bytes)?;
        debug!(path = %path.display(), chunks = store.len(), "vector store loaded");
        Ok(store)
    }

    pub fn save(&self, path: &Path) -> Result<(), CorpusError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_vec(self)?)?;
        debug!(path = %path.display(), chunks = self.len(), "vector store saved");
        Ok(())
    }

    /// Top-`k` chunks by cosine similarity. Equal scores keep insertion order.
    pub fn similarity_search(&self, query: &[f32], k: usize) -> Vec<RetrievedDoc> {
        let mut scored: Vec<(f32, &StoredChunk)> = self
            .chunks
            .iter()
            .map(|chunk| (cosine_similarity(query, &chunk.embedding), chunk))
            .collect();
        scored.sort_by(|a, b| b.0.total_cmp(&a.0));

        scored
            .into_iter()
            .take(k)
            .map(|(_, chunk)| RetrievedDoc {
                content: chunk.content.clone(),
                source: chunk.source.clone(),
                file_path: chunk.file_path.clone(),
            })
            .collect()
    }
}

/// Cosine similarity. Empty, mismatched, zero and overflowing vectors score 0.
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    let score = dot / (norm_a * norm_b);
    if score.is_finite() {
        score
    } else {
        0.0
    }
}

/// Similarity search over the corpus.
pub trait Retriever {
    fn retrieve(
        &self,
        query: &str,
        k: usize,
    ) -> impl Future<Output = Result<Vec<RetrievedDoc>, CorpusError>> + Send;
}

/// Embeds the query with the same model the index was built with, then searches.
pub struct EmbeddingRetriever<E> {
    embedder: E,
    store: VectorStore,
}

impl<E: Embedder> EmbeddingRetriever<E> {
    pub fn new(embedder: E, store: VectorStore) -> Self {
        Self { embedder, store }
    }
}

impl<E: Embedder + Sync> Retriever for EmbeddingRetriever<E> {
    async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<RetrievedDoc>, CorpusError> {
        if self.store.is_empty() {
            return Ok(Vec::new());
        }
        let mut vectors = self.embedder.embed(&[query.to_string()]).await?;
        let query_vec = vectors.pop().ok_or_else(|| {
            CorpusError::Embedding(crate::openai::OpenAiError::EmptyResponse)
        })?;
        Ok(self.store.similarity_search(&query_vec, k))
    }
}
