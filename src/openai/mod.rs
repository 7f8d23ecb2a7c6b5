//! Hosted model access: chat completions and embeddings behind small traits,
//! so the chains can be driven by scripted models in tests.

pub mod client;
pub mod types;

pub use client::{ChatModel, DEFAULT_BASE_URL, Embedder, OpenAiClient, OpenAiError};
pub use types::{Message, ModelProfile, Role};

#[cfg(test)]
pub(crate) mod mock;
