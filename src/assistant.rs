use std::future::Future;

use serde::Serialize;

use crate::corpus::Retriever;
use crate::openai::ChatModel;
use crate::rag::RagChain;
use crate::spe::SpeChain;

/// What a chat surface shows for one turn.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reply {
    pub answer: String,
    pub sources: Vec<String>,
    pub query_type: String,
}

/// A chain that can sit behind the REPL or the HTTP surface.
pub trait Assistant {
    fn reply(&self, query: &str) -> impl Future<Output = Reply> + Send;
}

impl<C, R> Assistant for RagChain<C, R>
where
    C: ChatModel + Sync,
    R: Retriever + Sync,
{
    async fn reply(&self, query: &str) -> Reply {
        let result = self.answer_query(query, false).await;
        Reply {
            answer: result.answer,
            sources: result.sources,
            query_type: result.query_type.to_string(),
        }
    }
}

impl<C: ChatModel + Sync> Assistant for SpeChain<C> {
    async fn reply(&self, query: &str) -> Reply {
        let result = self.answer_query(query).await;
        Reply {
            answer: result.answer,
            sources: Vec::new(),
            query_type: result.query_type.to_string(),
        }
    }
}
