//! Retrieval-augmented chain over the document corpus. Queries arrive in
//! Chichewa, are answered in English from retrieved chunks, and are translated
//! back.

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::classify::{Classifier, QueryType};
use crate::corpus::{RetrievedDoc, Retriever};
use crate::openai::{ChatModel, Message, ModelProfile};
use crate::translate::Translator;

pub const APPROACH: &str = "retrieval_augmented_generation";

const GREETING: &str = "Hello! I'm here to help you with questions about news articles. \
You can ask me about events, people, sports, politics, or any news topics. \
What would you like to know?";

const OUT_OF_SCOPE: &str = "I'm sorry, but I'm designed specifically to answer questions about \
news articles in my knowledge base. I can help you with information about events, people, \
sports, politics, and other news topics covered in the articles. \
Is there anything about the news you'd like to know?";

const NO_DOCUMENTS: &str = "I couldn't find any relevant information in the documents.";
const GENERATION_FAILED: &str = "I encountered an error generating the answer.";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RagAnswer {
    pub answer: String,
    pub query_type: QueryType,
    pub sources: Vec<String>,
    pub english_query: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub english_answer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retrieved_docs: Option<Vec<RetrievedDoc>>,
}

pub struct RagChain<C, R> {
    llm: C,
    answer_profile: ModelProfile,
    translator: Translator<C>,
    classifier: Classifier<C>,
    retriever: R,
    k: usize,
}

impl<C: ChatModel + Clone, R: Retriever> RagChain<C, R> {
    pub fn new(
        llm: C,
        answer_profile: ModelProfile,
        translation_profile: ModelProfile,
        classifier_profile: ModelProfile,
        retriever: R,
        k: usize,
    ) -> Self {
        Self {
            translator: Translator::new(llm.clone(), translation_profile),
            classifier: Classifier::new(llm.clone(), classifier_profile),
            llm,
            answer_profile,
            retriever,
            k,
        }
    }
}

impl<C: ChatModel, R: Retriever> RagChain<C, R> {
    /// Translate → classify → route. Only relevant queries touch the corpus.
    pub async fn answer_query(&self, chichewa_query: &str, return_metadata: bool) -> RagAnswer {
        let english_query = self.translator.to_english(chichewa_query).await;
        let query_type = self.classifier.news(&english_query).await;
        info!(%query_type, "query routed");

        let canned = match query_type {
            QueryType::Greeting => Some(GREETING),
            QueryType::OutOfScope => Some(OUT_OF_SCOPE),
            QueryType::Relevant => None,
        };
        if let Some(english) = canned {
            return RagAnswer {
                answer: self.translator.to_chichewa(english).await,
                query_type,
                sources: Vec::new(),
                english_query,
                english_answer: None,
                retrieved_docs: None,
            };
        }

        let docs = self.retrieve(&english_query).await;
        let (english_answer, sources) = self.generate_answer(&english_query, &docs).await;
        let answer = self.translator.to_chichewa(&english_answer).await;

        let (english_answer, retrieved_docs) = if return_metadata {
            (Some(english_answer), Some(docs))
        } else {
            (None, None)
        };
        RagAnswer {
            answer,
            query_type,
            sources,
            english_query,
            english_answer,
            retrieved_docs,
        }
    }

    async fn retrieve(&self, english_query: &str) -> Vec<RetrievedDoc> {
        match self.retriever.retrieve(english_query, self.k).await {
            Ok(docs) => {
                debug!(count = docs.len(), k = self.k, "documents retrieved");
                docs
            }
            Err(e) => {
                warn!(error = %e, "retrieval failed, answering without documents");
                Vec::new()
            }
        }
    }

    /// English answer grounded in `docs`, plus the distinct sources in
    /// first-seen order.
    pub async fn generate_answer(
        &self,
        english_query: &str,
        docs: &[RetrievedDoc],
    ) -> (String, Vec<String>) {
        if docs.is_empty() {
            return (NO_DOCUMENTS.to_string(), Vec::new());
        }

        let mut sources: Vec<String> = Vec::new();
        let mut blocks = Vec::with_capacity(docs.len());
        for (i, doc) in docs.iter().enumerate() {
            blocks.push(format!("[Document {} - {}]\n{}", i + 1, doc.source, doc.content));
            if !sources.contains(&doc.source) {
                sources.push(doc.source.clone());
            }
        }
        let context = blocks.join("\n\n");

        let prompt = format!(
            "You are a helpful assistant answering questions based on news articles.

Use the following context from news articles to answer the question. If the answer cannot be found in the context, say so clearly.

Context:
{context}

Question: {english_query}

Provide a clear, accurate answer based on the context above. If the information is not in the context, say \"I don't have information about that in the available articles.\""
        );
        let request = self.answer_profile.request(vec![Message::user(prompt)]);
        match self.llm.complete(&request).await {
            Ok(answer) => (answer, sources),
            Err(e) => {
                warn!(error = %e, "answer generation failed");
                (GENERATION_FAILED.to_string(), sources)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::CorpusError;
    use crate::openai::OpenAiError;
    use crate::openai::mock::ScriptedChat;
    use std::sync::{Arc, Mutex};

    /// Returns fixed documents, or fails when none were given.
    #[derive(Clone, Default)]
    struct FixedRetriever {
        docs: Option<Vec<RetrievedDoc>>,
        queries: Arc<Mutex<Vec<(String, usize)>>>,
    }

    impl Retriever for FixedRetriever {
        async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<RetrievedDoc>, CorpusError> {
            self.queries.lock().unwrap().push((query.to_string(), k));
            self.docs
                .clone()
                .ok_or_else(|| CorpusError::NotFound("vector store not found".into()))
        }
    }

    fn doc(source: &str, content: &str) -> RetrievedDoc {
        RetrievedDoc {
            content: content.into(),
            source: source.into(),
            file_path: format!("data/docs/{source}"),
        }
    }

    fn chain(chat: &ScriptedChat, retriever: FixedRetriever) -> RagChain<ScriptedChat, FixedRetriever> {
        RagChain::new(
            chat.clone(),
            ModelProfile::new("gpt-4", 0.7),
            ModelProfile::new("gpt-4", 0.3),
            ModelProfile::new("gpt-4", 0.0),
            retriever,
            3,
        )
    }

    #[tokio::test]
    async fn greeting_translates_canned_reply_without_retrieval() {
        let chat = ScriptedChat::replies(&["Hello, how are you?", "greeting", "Moni! Ndili pano..."]);
        let retriever = FixedRetriever::default();
        let result = chain(&chat, retriever.clone()).answer_query("Moni, muli bwanji?", true).await;

        assert_eq!(result.query_type, QueryType::Greeting);
        assert_eq!(result.answer, "Moni! Ndili pano...");
        assert_eq!(result.english_query, "Hello, how are you?");
        assert!(result.sources.is_empty());
        assert_eq!(result.english_answer, None);
        assert!(retriever.queries.lock().unwrap().is_empty());
        assert_eq!(chat.requests()[2].messages[1].content, GREETING);
    }

    #[tokio::test]
    async fn out_of_scope_translates_refusal() {
        let chat = ScriptedChat::replies(&["What is 2 + 2?", "out_of_scope", "Pepani..."]);
        let result = chain(&chat, FixedRetriever::default())
            .answer_query("Kodi 2 + 2 ndi zingati?", false)
            .await;

        assert_eq!(result.query_type, QueryType::OutOfScope);
        assert_eq!(result.answer, "Pepani...");
        assert_eq!(chat.requests()[2].messages[1].content, OUT_OF_SCOPE);
    }

    #[tokio::test]
    async fn relevant_query_retrieves_generates_and_translates() {
        let chat = ScriptedChat::replies(&[
            "Tell me about sports",
            "relevant",
            "The team won the final.",
            "Timu inapambana.",
        ]);
        let retriever = FixedRetriever {
            docs: Some(vec![
                doc("sports.txt", "The team won the final."),
                doc("sports.txt", "Fans celebrated."),
                doc("national.txt", "Parliament met."),
            ]),
            ..Default::default()
        };
        let result = chain(&chat, retriever.clone())
            .answer_query("Ndiuzeni za masewera", true)
            .await;

        assert_eq!(result.query_type, QueryType::Relevant);
        assert_eq!(result.answer, "Timu inapambana.");
        assert_eq!(result.sources, vec!["sports.txt", "national.txt"]);
        assert_eq!(result.english_answer.as_deref(), Some("The team won the final."));
        assert_eq!(result.retrieved_docs.as_ref().map(Vec::len), Some(3));
        assert_eq!(
            retriever.queries.lock().unwrap().as_slice(),
            &[("Tell me about sports".to_string(), 3)]
        );

        let prompt = chat.prompt(2);
        assert!(prompt.contains(
            "[Document 1 - sports.txt]\nThe team won the final.\n\n[Document 2 - sports.txt]"
        ));
        assert!(prompt.contains("Question: Tell me about sports"));
        assert_eq!(chat.requests()[2].temperature, 0.7);
    }

    #[tokio::test]
    async fn metadata_is_omitted_unless_requested() {
        let chat = ScriptedChat::replies(&["q", "relevant", "a", "b"]);
        let retriever = FixedRetriever {
            docs: Some(vec![doc("x.txt", "x")]),
            ..Default::default()
        };
        let result = chain(&chat, retriever).answer_query("funso", false).await;

        assert_eq!(result.english_answer, None);
        assert_eq!(result.retrieved_docs, None);
        let json = serde_json::to_value(&result).unwrap();
        assert!(json.get("english_answer").is_none());
        assert_eq!(json["query_type"], "relevant");
    }

    #[tokio::test]
    async fn retrieval_failure_answers_with_no_documents() {
        let chat = ScriptedChat::replies(&["q", "relevant", "Sindinapeze zambiri."]);
        let result = chain(&chat, FixedRetriever::default())
            .answer_query("funso", true)
            .await;

        assert!(result.sources.is_empty());
        assert_eq!(result.english_answer.as_deref(), Some(NO_DOCUMENTS));
        assert_eq!(result.retrieved_docs, Some(Vec::new()));
        // translate, classify, translate back: no generation call
        assert_eq!(chat.requests().len(), 3);
    }

    #[tokio::test]
    async fn generation_failure_keeps_sources() {
        let chat = ScriptedChat::default();
        chat.push(Err(OpenAiError::RateLimited));
        let c = chain(&chat, FixedRetriever::default());

        let (answer, sources) = c
            .generate_answer("q", &[doc("a.txt", "1"), doc("a.txt", "2")])
            .await;
        assert_eq!(answer, GENERATION_FAILED);
        assert_eq!(sources, vec!["a.txt"]);
    }
}
