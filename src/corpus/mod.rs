//! Document corpus: loading, chunking, embedding, and the persisted vector index.

mod contacts;
mod loader;
pub(crate) mod store;

pub use contacts::{CONTACTS_SOURCE, contacts_document};
pub use loader::{load_documents, split_documents};
pub use store::{EmbeddingRetriever, RetrievedDoc, Retriever, VectorStore};

use std::path::Path;

use futures::stream::{self, StreamExt, TryStreamExt};
use tracing::info;

use crate::openai::{Embedder, OpenAiError};
use store::StoredChunk;

pub const CHUNK_SIZE: usize = 1000;
pub const CHUNK_OVERLAP: usize = 200;
const EMBED_BATCH: usize = 64;
const EMBED_CONCURRENCY: usize = 4;

#[derive(Debug, thiserror::Error)]
pub enum CorpusError {
    #[error("{0}")]
    NotFound(String),

    #[error("invalid file pattern: {0}")]
    Pattern(#[from] globset::Error),

    #[error("chunking failed: {0}")]
    Chunking(String),

    #[error("embedding failed: {0}")]
    Embedding(#[from] OpenAiError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed vector store: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub content: String,
    pub source: String,
    pub file_path: String,
}

/// Loads the corpus plus the contact sheet, chunks it, and embeds every chunk.
pub async fn build_index(
    embedder: &(impl Embedder + Sync),
    docs_dir: &Path,
    embedding_model: &str,
) -> Result<VectorStore, CorpusError> {
    let mut documents = load_documents(docs_dir)?;
    documents.push(contacts_document());
    let chunks = split_documents(&documents, CHUNK_SIZE, CHUNK_OVERLAP)?;

    let batches: Vec<Vec<Document>> = chunks.chunks(EMBED_BATCH).map(<[_]>::to_vec).collect();
    let embedded: Vec<Vec<StoredChunk>> = stream::iter(batches)
        .map(|batch| async move {
            let texts: Vec<String> = batch.iter().map(|d| d.content.clone()).collect();
            let vectors = embedder.embed(&texts).await?;
            Ok::<_, CorpusError>(
                batch
                    .into_iter()
                    .zip(vectors)
                    .map(|(doc, embedding)| StoredChunk {
                        content: doc.content,
                        source: doc.source,
                        file_path: doc.file_path,
                        embedding,
                    })
                    .collect(),
            )
        })
        .buffered(EMBED_CONCURRENCY)
        .try_collect()
        .await?;

    let mut store = VectorStore::new(embedding_model);
    store.chunks = embedded.into_iter().flatten().collect();
    info!(chunks = store.len(), model = embedding_model, "vector store built");
    Ok(store)
}

/// Opens the persisted index, building and saving it first when it is missing
/// or `force` is set.
pub async fn open_or_build(
    embedder: &(impl Embedder + Sync),
    docs_dir: &Path,
    store_path: &Path,
    embedding_model: &str,
    force: bool,
) -> Result<VectorStore, CorpusError> {
    if !force {
        match VectorStore::load(store_path) {
            Ok(store) => {
                info!(path = %store_path.display(), chunks = store.len(), "using existing vector store");
                return Ok(store);
            }
            Err(CorpusError::NotFound(_)) => {
                info!(path = %store_path.display(), "no vector store yet, processing documents");
            }
            Err(e) => return Err(e),
        }
    }

    let store = build_index(embedder, docs_dir, embedding_model).await?;
    store.save(store_path)?;
    Ok(store)
}
