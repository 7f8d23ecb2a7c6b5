use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use super::client::{ChatModel, Embedder, OpenAiError};
use super::types::ChatRequest;

/// Chat model that replays scripted replies in order and records every request.
#[derive(Clone, Default)]
pub struct ScriptedChat {
    responses: Arc<Mutex<VecDeque<Result<String, OpenAiError>>>>,
    requests: Arc<Mutex<Vec<ChatRequest>>>,
}

impl ScriptedChat {
    pub fn replies(replies: &[&str]) -> Self {
        let chat = Self::default();
        for reply in replies {
            chat.push(Ok(reply.to_string()));
        }
        chat
    }

    pub fn push(&self, response: Result<String, OpenAiError>) {
        self.responses.lock().unwrap().push_back(response);
    }

    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Concatenated content of every message of the `n`th request.
    pub fn prompt(&self, n: usize) -> String {
        self.requests()[n]
            .messages
            .iter()
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl ChatModel for ScriptedChat {
    async fn complete(&self, request: &ChatRequest) -> Result<String, OpenAiError> {
        self.requests.lock().unwrap().push(request.clone());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(OpenAiError::RateLimited))
    }
}

type EmbedFn = dyn Fn(&str) -> Vec<f32> + Send + Sync;

/// Embedder that maps each input through a fixed function.
#[derive(Clone)]
pub struct FnEmbedder {
    f: Arc<EmbedFn>,
    calls: Arc<Mutex<usize>>,
}

impl FnEmbedder {
    pub fn new(f: impl Fn(&str) -> Vec<f32> + Send + Sync + 'static) -> Self {
        Self {
            f: Arc::new(f),
            calls: Arc::new(Mutex::new(0)),
        }
    }

    /// Two-dimensional embedding: axis 0 counts "sport", axis 1 counts "bank".
    pub fn keywords() -> Self {
        Self::new(|text| {
            let lower = text.to_lowercase();
            vec![
                lower.matches("sport").count() as f32,
                lower.matches("bank").count() as f32,
            ]
        })
    }

    pub fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

impl Embedder for FnEmbedder {
    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, OpenAiError> {
        *self.calls.lock().unwrap() += 1;
        Ok(inputs.iter().map(|i| (self.f)(i)).collect())
    }
}
